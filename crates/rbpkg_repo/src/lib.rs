#![deny(missing_docs)]
//! The lazy, URL-addressed repository model: `Index`, `Bundle`,
//! `Channel`, `Release`, and `PackageRules`, plus the facade that caches
//! fully-loaded bundles by name.
//!
//! Every entity carries its own relative and resolved manifest URL and
//! loads its lazy fields from the [`rbpkg_loader::DataLoader`] passed to
//! it on first access, never eagerly and never more than once.

mod bundle;
mod channel;
mod index;
mod release;
mod repository;
mod rules;
mod urls;

pub use bundle::{Bundle, ResolvedRelease};
pub use channel::{Channel, ChannelEntry, ChannelType};
pub use index::{Index, IndexEntry};
pub use release::{Release, ReleaseType};
pub use repository::{get_repository, set_repository, PackageRepository, BASE_PATH};
pub use rules::{PackageRules, PackageType};
