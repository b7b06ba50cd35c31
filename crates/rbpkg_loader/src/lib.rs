#![deny(missing_docs)]
//! The data loader abstraction: fetching a manifest document by repository
//! path.
//!
//! `rbpkg` is meant to work with data coming from a central package
//! repository, but isn't hard-coded for that. [`DataLoader`] is the
//! capability every other crate in this workspace consumes for resolving
//! manifest content; concrete backends ([`FileDataLoader`],
//! [`InMemoryDataLoader`]) are swappable, and a process-wide instance is
//! available through [`get_data_loader`]/[`set_data_loader`] for callers
//! that don't want to thread a loader through every constructor.

mod file;
mod memory;
mod network;

use std::sync::{Mutex, OnceLock};
use std::sync::Arc;

pub use file::FileDataLoader;
pub use memory::InMemoryDataLoader;
pub use network::NetworkDataLoader;
use rbpkg_errors::{ConfigurationError, LoadDataError};
use serde_json::Value;

/// A source of manifest documents, addressed by repository-relative path.
///
/// Implementations must treat `parts` as forward-slash path segments
/// relative to the repository root; joining and normalization are the
/// loader's responsibility.
pub trait DataLoader: Send + Sync {
    /// Load and parse the document at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`LoadDataError`] when the path cannot be read or the
    /// content cannot be parsed as JSON.
    fn load_by_path(&self, parts: &[&str]) -> Result<Value, LoadDataError>;
}

/// Environment variable selecting the filesystem loader at process start.
pub const USE_FILE_LOADER_ENV: &str = "USE_FILE_LOADER";

/// Environment variable giving the filesystem loader's root directory.
pub const FILE_LOADER_ROOT_ENV: &str = "FILE_LOADER_ROOT";

static DATA_LOADER: OnceLock<Mutex<Option<Arc<dyn DataLoader>>>> = OnceLock::new();

fn cell() -> &'static Mutex<Option<Arc<dyn DataLoader>>> {
    DATA_LOADER.get_or_init(|| Mutex::new(None))
}

/// Set the process-wide data loader instance.
///
/// This is primarily meant for callers that configure the loader once at
/// startup, and for tests that want to swap in an
/// [`InMemoryDataLoader`] for the duration of a scenario. Pass `None` to
/// unset it.
pub fn set_data_loader(loader: Option<Arc<dyn DataLoader>>) {
    let mut guard = cell().lock().unwrap_or_else(|poison| poison.into_inner());
    *guard = loader;
}

/// Return the process-wide data loader, selecting one from the environment
/// on first use if none has been set explicitly.
///
/// If `USE_FILE_LOADER=1` is set, a [`FileDataLoader`] rooted at
/// `FILE_LOADER_ROOT` is installed. Otherwise a [`NetworkDataLoader`] is
/// installed, which is a stand-in for a real network transport supplied by
/// an embedding application (see the crate's module docs).
///
/// # Errors
///
/// Returns [`ConfigurationError`] if `USE_FILE_LOADER=1` is set but
/// `FILE_LOADER_ROOT` is unset or doesn't name a directory.
pub fn get_data_loader() -> Result<Arc<dyn DataLoader>, ConfigurationError> {
    {
        let guard = cell().lock().unwrap_or_else(|poison| poison.into_inner());
        if let Some(loader) = guard.as_ref() {
            return Ok(Arc::clone(loader));
        }
    }

    let loader: Arc<dyn DataLoader> = if std::env::var(USE_FILE_LOADER_ENV).as_deref() == Ok("1")
    {
        Arc::new(FileDataLoader::from_env()?)
    } else {
        Arc::new(NetworkDataLoader::unconfigured())
    };

    set_data_loader(Some(Arc::clone(&loader)));
    Ok(loader)
}
