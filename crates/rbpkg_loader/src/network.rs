use rbpkg_errors::LoadDataError;
use serde_json::Value;

use crate::DataLoader;

/// A placeholder for a real network-backed data loader.
///
/// The actual wire transport that fetches manifest documents from a remote
/// package repository is an external collaborator (see the crate's purpose
/// and scope docs): this type exists so the [`DataLoader`] interface has a
/// default selection at process start even when no embedding application
/// has wired in a concrete HTTP client. Every call fails with
/// [`LoadDataError`] until a real implementation is substituted via
/// [`crate::set_data_loader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkDataLoader {
    _private: (),
}

impl NetworkDataLoader {
    /// Construct the unconfigured placeholder loader.
    pub fn unconfigured() -> Self {
        Self { _private: () }
    }
}

impl DataLoader for NetworkDataLoader {
    fn load_by_path(&self, parts: &[&str]) -> Result<Value, LoadDataError> {
        Err(LoadDataError::new(format!(
            "No network data loader is configured; unable to load \"{}\". Set \
             {}=1 and {} to use a local checkout, or install a real network \
             loader via `set_data_loader`.",
            parts.join("/"),
            crate::USE_FILE_LOADER_ENV,
            crate::FILE_LOADER_ROOT_ENV,
        )))
    }
}
