//! Host identity: which OS/distribution and version is this process
//! running on.
//!
//! Real detection is expensive (it touches the filesystem or calls into
//! platform APIs) and the answer never changes for the lifetime of a
//! process, so it's cached behind a [`OnceLock`] the same way the data
//! loader crate caches its process-wide instance. A second, settable
//! cell lets tests and embedding applications pin a fixed host without
//! needing to compile for another target triple.

use std::sync::{Mutex, OnceLock};

/// The identity of the running host, as consulted by
/// [`crate::matches_current_system`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// The host's name: a Linux distribution id (e.g. `"ubuntu"`),
    /// `"macosx"`, or `"windows"`.
    pub name: String,
    /// The host's version string, in a form `matches_version_range` can
    /// parse as a PEP 440 version (e.g. `"22.04"`, `"14.5"`).
    pub version: String,
}

impl HostInfo {
    /// Construct a `HostInfo` from a name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

static HOST_INFO_OVERRIDE: OnceLock<Mutex<Option<HostInfo>>> = OnceLock::new();

fn override_cell() -> &'static Mutex<Option<HostInfo>> {
    HOST_INFO_OVERRIDE.get_or_init(|| Mutex::new(None))
}

/// Substitute a fixed host identity for [`detect_host_info`] and
/// [`crate::matches_current_system`]. Pass `None` to clear it and return
/// to real detection.
pub fn set_host_info_override(info: Option<HostInfo>) {
    let mut guard = override_cell()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner());
    *guard = info;
}

/// Returns the current override, if one has been set with
/// [`set_host_info_override`].
pub fn host_info_override() -> Option<HostInfo> {
    override_cell()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .clone()
}

/// Detects the real host identity: a Linux distribution name and
/// version parsed from `/etc/os-release`, `"macosx"` and the product
/// version on macOS, or `"windows"` and the OS version on Windows.
///
/// The result is computed once per process and cached; call
/// [`set_host_info_override`] in tests rather than relying on this
/// returning different values across calls.
pub fn detect_host_info() -> HostInfo {
    static DETECTED: OnceLock<HostInfo> = OnceLock::new();
    DETECTED.get_or_init(try_detect_host_info).clone()
}

#[cfg(target_os = "linux")]
fn try_detect_host_info() -> HostInfo {
    crate::linux::detect().unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to detect Linux host info from /etc/os-release");
        HostInfo::new("linux", "0")
    })
}

#[cfg(target_os = "macos")]
fn try_detect_host_info() -> HostInfo {
    crate::osx::detect().unwrap_or_else(|err| {
        tracing::warn!(%err, "failed to detect macOS host info");
        HostInfo::new("macosx", "0")
    })
}

#[cfg(target_os = "windows")]
fn try_detect_host_info() -> HostInfo {
    crate::win::detect().unwrap_or_else(|| {
        tracing::warn!("failed to detect Windows host info");
        HostInfo::new("windows", "0")
    })
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn try_detect_host_info() -> HostInfo {
    HostInfo::new("unknown", "0")
}

/// Serializes tests that touch the process-wide override cell, since
/// `cargo test` runs test functions concurrently by default.
#[cfg(test)]
pub(crate) fn override_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}
