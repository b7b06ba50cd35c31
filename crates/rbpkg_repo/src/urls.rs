use rbpkg_errors::{LoadDataError, RbpkgError};
use url::Url;

/// The placeholder base URL every manifest path is resolved against.
///
/// Nothing ever actually connects to this host: the resolved URL's path
/// segments are handed to a [`rbpkg_loader::DataLoader`], which may be
/// backed by a local filesystem, an in-memory fixture, or a real network
/// transport. Using a real `Url` to do the relative-resolution arithmetic
/// (rather than hand-rolled path joining) mirrors how manifest URLs are
/// described in the wire format: relative, resolved against a parent.
pub(crate) const REPOSITORY_BASE_URL: &str = "https://repository.invalid/packages/";

/// Resolves `relative` against `base`, both following `url::Url::join`
/// semantics.
pub(crate) fn resolve(base: &str, relative: &str) -> Result<Url, RbpkgError> {
    let base_url = Url::parse(base).map_err(|e| {
        LoadDataError::new(format!("Invalid base URL \"{base}\": {e}"))
    })?;
    base_url.join(relative).map_err(|e| {
        LoadDataError::new(format!(
            "Unable to resolve manifest URL \"{relative}\" against \"{base}\": {e}"
        ))
        .into()
    })
}

/// Parses a string that is already known to be an absolute manifest URL
/// (i.e. a previously-resolved [`resolve`] result stored back as a
/// string on an entity).
pub(crate) fn parse_absolute(absolute: &str) -> Result<Url, RbpkgError> {
    Url::parse(absolute)
        .map_err(|e| LoadDataError::new(format!("Invalid manifest URL \"{absolute}\": {e}")).into())
}

/// Splits a resolved manifest [`Url`] into the path segments a
/// [`rbpkg_loader::DataLoader`] expects.
pub(crate) fn path_parts(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| segments.map(str::to_string).collect())
        .unwrap_or_default()
}
