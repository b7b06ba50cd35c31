//! CLI-level environment configuration, read once at startup rather than
//! re-derived ad hoc by every call site (mirrors how `rattler_networking`
//! centralizes its environment-derived settings).

use std::path::{Path, PathBuf};

use rbpkg_errors::ConfigurationError;
use rbpkg_loader::{FILE_LOADER_ROOT_ENV, USE_FILE_LOADER_ENV};

/// The process's data-loader configuration.
///
/// [`rbpkg_loader::get_data_loader`] independently derives and caches the
/// same two environment variables the first time it's called; validating
/// them here too just lets the CLI fail fast with a clear message before
/// any resolution work starts, instead of surfacing the same
/// [`ConfigurationError`] from deep inside the first bundle lookup.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Whether `USE_FILE_LOADER=1` was set.
    pub use_file_loader: bool,
    /// The validated `FILE_LOADER_ROOT`, present only when
    /// `use_file_loader` is set.
    pub file_loader_root: Option<PathBuf>,
}

impl LoaderConfig {
    /// Reads and validates the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when `USE_FILE_LOADER=1` is set but
    /// `FILE_LOADER_ROOT` is unset or doesn't name an existing directory.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let use_file_loader = std::env::var(USE_FILE_LOADER_ENV).as_deref() == Ok("1");

        if !use_file_loader {
            return Ok(Self {
                use_file_loader,
                file_loader_root: None,
            });
        }

        let root = std::env::var(FILE_LOADER_ROOT_ENV).unwrap_or_default();
        if root.is_empty() || !Path::new(&root).is_dir() {
            return Err(ConfigurationError::new(format!(
                "${FILE_LOADER_ROOT_ENV} must be set to a valid directory path when \
                 ${USE_FILE_LOADER_ENV}=1."
            )));
        }

        Ok(Self {
            use_file_loader,
            file_loader_root: Some(PathBuf::from(root)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn defaults_to_network_loader_when_unset() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        std::env::remove_var(USE_FILE_LOADER_ENV);
        std::env::remove_var(FILE_LOADER_ROOT_ENV);

        let config = LoaderConfig::from_env().unwrap();
        assert!(!config.use_file_loader);
        assert_eq!(config.file_loader_root, None);
    }

    #[test]
    fn rejects_missing_root_when_file_loader_requested() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        std::env::set_var(USE_FILE_LOADER_ENV, "1");
        std::env::remove_var(FILE_LOADER_ROOT_ENV);

        let err = LoaderConfig::from_env().unwrap_err();
        assert!(err.0.contains(FILE_LOADER_ROOT_ENV));

        std::env::remove_var(USE_FILE_LOADER_ENV);
    }

    #[test]
    fn accepts_an_existing_directory_root() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        let dir = std::env::temp_dir();
        std::env::set_var(USE_FILE_LOADER_ENV, "1");
        std::env::set_var(FILE_LOADER_ROOT_ENV, &dir);

        let config = LoaderConfig::from_env().unwrap();
        assert!(config.use_file_loader);
        assert_eq!(config.file_loader_root, Some(dir));

        std::env::remove_var(USE_FILE_LOADER_ENV);
        std::env::remove_var(FILE_LOADER_ROOT_ENV);
    }
}
