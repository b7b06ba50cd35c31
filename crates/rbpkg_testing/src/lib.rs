#![deny(missing_docs)]
//! In-memory repository fixtures and host-identity overrides for testing
//! the rest of the workspace.
//!
//! [`FixtureRepository`] builds a small in-memory package repository (an
//! [`rbpkg_loader::InMemoryDataLoader`] under the hood) from a fluent
//! builder DSL, installs it as the process-wide data loader for the
//! duration of a test, and resolves a bundle/channel/version triple into
//! an `rbpkg_resolver::PackageSelection` ready to hand to
//! `PendingInstall::add_package`. [`HostOverrideGuard`] does the same for
//! the process-wide host identity consulted by system-selector matching.

mod fixture;
mod host;

pub use fixture::{
    BundleBuilder, ChannelBuilder, FixtureRepository, FixtureRepositoryBuilder,
    InstalledRepository, ReleaseBuilder, RuleBuilder,
};
pub use host::HostOverrideGuard;
