//! Low-level detection of the Windows version. See [`detect`].

use crate::host::HostInfo;

#[cfg(target_os = "windows")]
pub(crate) fn detect() -> Option<HostInfo> {
    let version = winver::WindowsVersion::detect()?;
    Some(HostInfo::new("windows", version.to_string()))
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn detect() -> Option<HostInfo> {
    None
}
