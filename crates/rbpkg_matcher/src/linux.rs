//! Low-level detection of the Linux distribution name and version. See
//! [`detect`].

use crate::host::HostInfo;

const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Detects the distribution name and version from `/etc/os-release`.
#[cfg(target_os = "linux")]
pub(crate) fn detect() -> Result<HostInfo, ParseHostInfoError> {
    let contents =
        std::fs::read_to_string(OS_RELEASE_PATH).map_err(ParseHostInfoError::FailedToRead)?;
    parse_os_release(&contents)
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn detect() -> Result<HostInfo, ParseHostInfoError> {
    Err(ParseHostInfoError::NotLinux)
}

/// Errors produced while detecting the host identity on Linux.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum ParseHostInfoError {
    #[error("failed to read `{OS_RELEASE_PATH}`")]
    FailedToRead(#[source] std::io::Error),

    #[error("`{OS_RELEASE_PATH}` is missing an ID= line")]
    MissingId,

    #[error("`{OS_RELEASE_PATH}` is missing a VERSION_ID= line")]
    MissingVersionId,

    #[error("the current platform is not Linux")]
    NotLinux,
}

/// Parses the `KEY=value` lines of an `os-release` file, extracting the
/// `ID` and `VERSION_ID` fields into a [`HostInfo`]. Values may be
/// wrapped in single or double quotes, which are stripped.
fn parse_os_release(contents: &str) -> Result<HostInfo, ParseHostInfoError> {
    let mut id = None;
    let mut version_id = None;

    for line in contents.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let value = value.trim().trim_matches(['"', '\'']);
        match key.trim() {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version_id = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(HostInfo::new(
        id.ok_or(ParseHostInfoError::MissingId)?,
        version_id.ok_or(ParseHostInfoError::MissingVersionId)?,
    ))
}
