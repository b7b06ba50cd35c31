use serde::{Deserialize, Serialize};

/// One published version within a [`crate::Channel`].
///
/// Identity is the pair `(channel, version)`; the channel half lives on
/// the owning [`crate::Channel`], not on this type, since back-references
/// are lookup-only in this crate (see the repository model's ownership
/// notes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// The version string, interpretable as a PEP 440 version.
    pub version: String,

    /// The release's maturity tier.
    #[serde(rename = "type", default)]
    pub release_type: ReleaseType,

    /// Whether this release is eligible for selection. Hidden releases
    /// are kept in the manifest (e.g. for historical record) but never
    /// chosen by [`crate::Bundle::get_latest_release_for_version_range`].
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Optional link to human-readable release notes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub release_notes_url: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A release's maturity tier, ordered loosely from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Early, unstable preview.
    Alpha,
    /// More stable than alpha, still pre-release.
    Beta,
    /// Release candidate.
    Rc,
    /// Generally available.
    #[default]
    Stable,
}
