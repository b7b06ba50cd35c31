use serde::{Deserialize, Serialize};

/// The platform-specific install recipe applicable to a version range
/// within a [`crate::Channel`].
///
/// Selection walks a channel's ordered rule list and returns the first
/// rule whose [`PackageRules::matches`] is true for a given version and
/// host; order is significant, callers must preserve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRules {
    /// A version-specifier expression (or `"*"`) selecting which
    /// releases this rule applies to.
    pub version_range: String,

    /// System-selector expressions; `"*"` (the default single-element
    /// list) means every host.
    #[serde(default = "default_wildcard_systems")]
    pub systems: Vec<String>,

    /// The kind of artifact this rule installs.
    pub package_type: PackageType,

    /// The platform-native package name to install.
    pub package_name: String,

    /// Dependency specs (`NAME<specifier>`) that must always be
    /// installed alongside this package.
    #[serde(default)]
    pub required: Vec<String>,

    /// Dependency specs installed under `install_deps_mode ∈
    /// {RECOMMENDED, ALL}`.
    #[serde(default)]
    pub recommended: Vec<String>,

    /// Dependency specs installed only under `install_deps_mode = ALL`.
    #[serde(default)]
    pub optional: Vec<String>,

    /// Bundle names this package supersedes, for an execution
    /// collaborator to act on; not interpreted by the resolution engine.
    #[serde(default)]
    pub replaces: Vec<String>,

    /// Shell commands run before install, for an execution collaborator.
    #[serde(default)]
    pub pre_install_commands: Vec<String>,

    /// Shell commands that perform the install, for an execution
    /// collaborator.
    #[serde(default)]
    pub install_commands: Vec<String>,

    /// Shell commands run after install, for an execution collaborator.
    #[serde(default)]
    pub post_install_commands: Vec<String>,

    /// Shell commands that perform an uninstall, for an execution
    /// collaborator.
    #[serde(default)]
    pub uninstall_commands: Vec<String>,

    /// Free-form flags passed through to the execution collaborator.
    #[serde(default)]
    pub install_flags: Vec<String>,
}

fn default_wildcard_systems() -> Vec<String> {
    vec!["*".to_string()]
}

impl PackageRules {
    /// Returns `true` if this rule applies to `version` and, when
    /// `require_current_system` is set, to the running host.
    pub fn matches(&self, version: &str, require_current_system: bool) -> bool {
        if !rbpkg_matcher::matches_version_range(version, &self.version_range, None) {
            return false;
        }

        !require_current_system || rbpkg_matcher::matches_current_system(&self.systems)
    }
}

/// The kind of artifact a [`PackageRules`] installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// A Python package, typically installed via pip.
    Python,
    /// An RPM package.
    Rpm,
    /// A Debian package.
    Deb,
    /// Built from source.
    Source,
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PackageType::Python => "python",
            PackageType::Rpm => "rpm",
            PackageType::Deb => "deb",
            PackageType::Source => "source",
        };
        f.write_str(label)
    }
}
