//! Version-string formatting, carried over from `rbpkg/__init__.py`'s
//! `get_version_string`.

/// The pre-release tag appended to the crate's semantic version, or
/// `None` once this becomes a tagged release build.
pub const PRERELEASE_TAG: Option<&str> = Some("alpha");

/// Formats the version string printed by `--version`: the crate's
/// `Cargo.toml` version, with the pre-release tag and a `(dev)` suffix
/// appended while [`PRERELEASE_TAG`] is set.
pub fn version_string() -> String {
    let mut version = env!("CARGO_PKG_VERSION").to_string();

    if let Some(tag) = PRERELEASE_TAG {
        version.push_str(&format!(" {tag} (dev)"));
    }

    version
}
