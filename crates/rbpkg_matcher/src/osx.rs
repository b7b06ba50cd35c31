//! Low-level detection of the macOS product version. See [`detect`].

use crate::host::HostInfo;

#[cfg(target_os = "macos")]
pub(crate) fn detect() -> Result<HostInfo, ParseHostInfoError> {
    let file = std::fs::read_to_string("/System/Library/CoreServices/SystemVersion.plist")
        .map_err(ParseHostInfoError::FailedToReadSystemVersion)?;
    let cursor = std::io::Cursor::new(file.as_bytes());
    let value =
        plist::Value::from_reader(cursor).map_err(|_err| ParseHostInfoError::CorruptedDictionary)?;

    let version = value
        .as_dictionary()
        .ok_or(ParseHostInfoError::CorruptedDictionary)?
        .get("ProductVersion")
        .ok_or(ParseHostInfoError::MissingProductVersion)?
        .as_string()
        .ok_or(ParseHostInfoError::ProductVersionIsNotAString)?;

    Ok(HostInfo::new("macosx", version))
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn detect() -> Result<HostInfo, ParseHostInfoError> {
    Err(ParseHostInfoError::NotMacos)
}

/// Errors produced while detecting the host identity on macOS.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ParseHostInfoError {
    #[error("failed to read `/System/Library/CoreServices/SystemVersion.plist`")]
    FailedToReadSystemVersion(#[source] std::io::Error),

    #[error("SystemVersion.plist is not a dictionary")]
    CorruptedDictionary,

    #[error("SystemVersion.plist is missing the ProductVersion string")]
    MissingProductVersion,

    #[error("SystemVersion.plist ProductVersion value is not a string")]
    ProductVersionIsNotAString,

    #[error("the current platform is not macOS")]
    NotMacos,
}
