use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rbpkg_errors::{PackageLookupError, RbpkgError};

use crate::bundle::Bundle;
use crate::index::Index;

/// The repository-relative base path every manifest lives under.
pub const BASE_PATH: &str = "/packages/";

/// The single entry point for looking up repository content.
///
/// Per the engine's concurrency model this crate is single-threaded
/// cooperative: the facade's caches use `RefCell`, suitable for one
/// logical owner, not a `Mutex`/`Arc` pair sized for cross-thread
/// sharing. Obtain the process-wide instance with [`get_repository`];
/// construct an independent one with [`PackageRepository::new`] when a
/// test wants isolation without touching the global.
#[derive(Debug, Default)]
pub struct PackageRepository {
    index: RefCell<Option<Rc<Index>>>,
    bundles_by_name: RefCell<HashMap<String, Rc<RefCell<Bundle>>>>,
}

impl PackageRepository {
    /// Construct an empty repository with cold caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the repository index, fetching and caching it on first
    /// call.
    pub fn get_index(&self) -> Result<Rc<Index>, RbpkgError> {
        if let Some(index) = self.index.borrow().as_ref() {
            return Ok(Rc::clone(index));
        }

        let loader = rbpkg_loader::get_data_loader()?;
        let index = Rc::new(Index::load(&*loader)?);
        *self.index.borrow_mut() = Some(Rc::clone(&index));
        Ok(index)
    }

    /// Looks up a bundle by name, fully loading and caching it on first
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`PackageLookupError`] when the name isn't in the index,
    /// or when loading its manifest fails.
    pub fn lookup_package_bundle(&self, name: &str) -> Result<Rc<RefCell<Bundle>>, RbpkgError> {
        if let Some(bundle) = self.bundles_by_name.borrow().get(name) {
            return Ok(Rc::clone(bundle));
        }

        let loader = rbpkg_loader::get_data_loader()?;
        let index = self.get_index()?;
        let entry = index.bundle_entry(name).ok_or_else(|| {
            RbpkgError::from(PackageLookupError::new(format!(
                "No package bundle named \"{name}\""
            )))
        })?;

        let mut bundle = Bundle::from_index_entry(entry)?;
        bundle.load(&*loader).map_err(|err| match err {
            RbpkgError::LoadData(load_err) => {
                RbpkgError::from(PackageLookupError::from_load_error(name, &load_err))
            }
            other => other,
        })?;

        let bundle = Rc::new(RefCell::new(bundle));
        self.bundles_by_name
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&bundle));
        Ok(bundle)
    }

    /// Drops every cached entity. Safe only when no lookup is in
    /// flight, per the engine's single-threaded cooperative model.
    pub fn clear_caches(&self) {
        *self.index.borrow_mut() = None;
        self.bundles_by_name.borrow_mut().clear();
    }
}

thread_local! {
    static REPOSITORY: RefCell<Option<Rc<PackageRepository>>> = const { RefCell::new(None) };
}

/// Substitutes a repository instance for [`get_repository`]. Pass
/// `None` to clear it so the next call constructs a fresh one.
///
/// This, like the data loader and host-info cells, is a single
/// process-wide (here: single-thread-wide) slot — not a concurrency
/// primitive, consistent with the facade's `RefCell`-based caches.
pub fn set_repository(repository: Option<Rc<PackageRepository>>) {
    REPOSITORY.with(|cell| *cell.borrow_mut() = repository);
}

/// Returns the thread-wide repository instance, constructing an empty
/// one on first use.
pub fn get_repository() -> Rc<PackageRepository> {
    REPOSITORY.with(|cell| {
        if let Some(repository) = cell.borrow().as_ref() {
            return Rc::clone(repository);
        }
        let repository = Rc::new(PackageRepository::new());
        *cell.borrow_mut() = Some(Rc::clone(&repository));
        repository
    })
}
