//! An RAII guard for pinning the process-wide host identity during a test.

use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, OnceLock};

use rbpkg_matcher::HostInfo;

fn host_override_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Pins [`rbpkg_matcher::detect_host_info`]/`matches_current_system` to a
/// fixed `HostInfo` for as long as the guard is alive, reverting to real
/// detection on drop.
///
/// Holds a lock serializing access to the process-wide override cell
/// across concurrently-running tests in the same test binary.
pub struct HostOverrideGuard {
    _guard: MutexGuard<'static, ()>,
    host: HostInfo,
}

impl HostOverrideGuard {
    /// Installs `host` as the process-wide host identity.
    pub fn install(host: HostInfo) -> Self {
        let guard = host_override_lock()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rbpkg_matcher::set_host_info_override(Some(host.clone()));
        Self { _guard: guard, host }
    }

    /// Convenience constructor: `HostOverrideGuard::named("ubuntu", "20.04")`.
    pub fn named(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::install(HostInfo::new(name, version))
    }
}

impl Deref for HostOverrideGuard {
    type Target = HostInfo;

    fn deref(&self) -> &HostInfo {
        &self.host
    }
}

impl Drop for HostOverrideGuard {
    fn drop(&mut self) {
        rbpkg_matcher::set_host_info_override(None);
    }
}
