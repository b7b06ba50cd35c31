#![deny(missing_docs)]
//! The structured error taxonomy shared by every other `rbpkg` crate.
//!
//! Each variant corresponds to one failure mode described in the resolution
//! engine's design: a manifest fetch/parse failure, a misconfigured loader,
//! a missing bundle, an install that has no applicable rule, or a version
//! conflict between two already-accepted dependencies. Crates lower in the
//! dependency order (the loader, the matcher) only ever raise
//! [`LoadDataError`] and [`ConfigurationError`]; the repository facade and
//! resolution engine raise the rest.

use thiserror::Error;

/// A manifest document could not be fetched or could not be parsed as JSON.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LoadDataError(pub String);

impl LoadDataError {
    /// Construct a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The data loader (or the environment it depends on) is unusable.
///
/// This is distinct from [`LoadDataError`]: it indicates the loader itself
/// cannot function (e.g. a required environment variable is unset), not
/// that a particular path failed to resolve.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigurationError(pub String);

impl ConfigurationError {
    /// Construct a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A named package bundle could not be found in the repository.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PackageLookupError(pub String);

impl PackageLookupError {
    /// Construct a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Build the error raised when a loader failure occurs during a bundle
    /// lookup by name, folding the original [`LoadDataError`] into the
    /// message the way the facade is specified to do.
    pub fn from_load_error(name: &str, source: &LoadDataError) -> Self {
        Self(format!("Unable to look up package bundle \"{name}\": {source}"))
    }
}

/// A release exists but has no rule applicable to this host, or no rule
/// matching the requested package type.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PackageInstallError(pub String);

impl PackageInstallError {
    /// Construct a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Two accepted packages require mutually incompatible versions of a third.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DependencyConflictError(pub String);

impl DependencyConflictError {
    /// Construct a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The union of every error kind the resolution engine can raise.
///
/// Lower-level components return their specific error type directly
/// (`LoadDataError`, `ConfigurationError`); this enum exists for call sites
/// — principally the CLI — that need one type to propagate with `?` across
/// component boundaries, the way `rattler_repodata_gateway::GatewayError`
/// wraps `FetchRepoDataError` with `#[from]`.
#[derive(Debug, Error)]
pub enum RbpkgError {
    /// See [`LoadDataError`].
    #[error(transparent)]
    LoadData(#[from] LoadDataError),

    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// See [`PackageLookupError`].
    #[error(transparent)]
    PackageLookup(#[from] PackageLookupError),

    /// See [`PackageInstallError`].
    #[error(transparent)]
    PackageInstall(#[from] PackageInstallError),

    /// See [`DependencyConflictError`].
    #[error(transparent)]
    DependencyConflict(#[from] DependencyConflictError),
}

impl RbpkgError {
    /// The short tag the CLI prefixes error output with (`[<kind>]`).
    pub fn kind_label(&self) -> &'static str {
        match self {
            RbpkgError::LoadData(_) => "LoadDataError",
            RbpkgError::Configuration(_) => "ConfigurationError",
            RbpkgError::PackageLookup(_) => "PackageLookupError",
            RbpkgError::PackageInstall(_) => "PackageInstallError",
            RbpkgError::DependencyConflict(_) => "DependencyConflictError",
        }
    }
}
