use std::path::{Component, Path, PathBuf};

use rbpkg_errors::{ConfigurationError, LoadDataError};
use serde_json::Value;
use tracing::debug;

use crate::{DataLoader, FILE_LOADER_ROOT_ENV};

/// A data loader that reads JSON manifests from local files.
///
/// This is primarily intended for local development and for driving the
/// CLI against a checked-out copy of a repository tree, rather than against
/// the live network endpoint.
pub struct FileDataLoader {
    root: PathBuf,
}

impl FileDataLoader {
    /// Construct a loader rooted at the given directory.
    ///
    /// The directory is not required to exist yet at construction time;
    /// failures surface lazily from [`DataLoader::load_by_path`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Construct a loader using the `FILE_LOADER_ROOT` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the variable is unset or does not
    /// name an existing directory.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let root = std::env::var(FILE_LOADER_ROOT_ENV).unwrap_or_default();

        if root.is_empty() || !Path::new(&root).is_dir() {
            return Err(ConfigurationError::new(format!(
                "${FILE_LOADER_ROOT_ENV} must be set to a valid directory path when using \
                 FileDataLoader."
            )));
        }

        Ok(Self::new(root))
    }

    /// Normalize a repository path (forward-slash segments, possibly with
    /// `.` or `..` components) into a native path rooted at `self.root`,
    /// rejecting any attempt to escape the root.
    fn normalize(&self, parts: &[&str]) -> Result<PathBuf, LoadDataError> {
        let mut normalized = PathBuf::new();

        for part in parts.iter().flat_map(|p| p.split('/')) {
            match Path::new(part)
                .components()
                .next()
            {
                None => continue,
                Some(Component::ParentDir) => {
                    return Err(LoadDataError::new(format!(
                        "Path \"{}\" attempts to escape the repository root.",
                        parts.join("/")
                    )));
                }
                Some(Component::CurDir) => continue,
                _ => normalized.push(part),
            }
        }

        Ok(self.root.join(normalized))
    }
}

impl DataLoader for FileDataLoader {
    fn load_by_path(&self, parts: &[&str]) -> Result<Value, LoadDataError> {
        let path = self.normalize(parts)?;
        debug!(path = %path.display(), "loading manifest from file");

        let contents = fs_err_read(&path)?;

        serde_json::from_str(&contents).map_err(|e| {
            LoadDataError::new(format!("Unable to parse data at \"{}\": {e}", path.display()))
        })
    }
}

fn fs_err_read(path: &Path) -> Result<String, LoadDataError> {
    std::fs::read_to_string(path)
        .map_err(|e| LoadDataError::new(format!("Unable to load \"{}\": {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("packages/widget")).unwrap();
        std::fs::write(
            dir.path().join("packages/widget/index.json"),
            r#"{"name": "widget"}"#,
        )
        .unwrap();

        let loader = FileDataLoader::new(dir.path());
        let doc = loader
            .load_by_path(&["packages", "widget", "index.json"])
            .unwrap();
        assert_eq!(doc["name"], "widget");
    }

    #[test]
    fn missing_file_is_load_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileDataLoader::new(dir.path());
        let err = loader.load_by_path(&["packages", "index.json"]).unwrap_err();
        assert!(err.0.contains("Unable to load"));
    }

    #[test]
    fn invalid_json_is_load_data_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let loader = FileDataLoader::new(dir.path());
        let err = loader.load_by_path(&["bad.json"]).unwrap_err();
        assert!(err.0.contains("Unable to parse"));
    }

    #[test]
    fn rejects_parent_directory_escape() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileDataLoader::new(dir.path());
        let err = loader
            .load_by_path(&["..", "etc", "passwd"])
            .unwrap_err();
        assert!(err.0.contains("escape"));
    }

    #[test]
    fn from_env_requires_valid_directory() {
        std::env::remove_var(FILE_LOADER_ROOT_ENV);
        let err = FileDataLoader::from_env().unwrap_err();
        assert!(err.0.contains(FILE_LOADER_ROOT_ENV));
    }
}
