use chrono::{DateTime, Utc};
use rbpkg_errors::RbpkgError;
use rbpkg_loader::DataLoader;
use serde::{Deserialize, Serialize};

use crate::release::Release;
use crate::rules::PackageRules;
use crate::urls::{parse_absolute, path_parts, resolve};

/// A named release track inside a [`crate::Bundle`] (e.g. `"1.0.x"`).
///
/// `releases` and `package_rules` are lazy: they're empty and
/// [`Channel::is_loaded`] is `false` until the first call to
/// [`Channel::load`], [`Channel::releases`], or
/// [`Channel::package_rules`].
#[derive(Debug, Clone)]
pub struct Channel {
    /// The channel's name, unique within its owning bundle.
    pub name: String,
    /// The channel manifest's URL, relative to the owning bundle's
    /// manifest URL.
    pub manifest_url: String,
    /// `manifest_url` resolved against the bundle's absolute manifest
    /// URL.
    pub absolute_manifest_url: String,
    /// The first visible release's version, mirrored from the bundle
    /// manifest so it's available without a load.
    pub latest_version: Option<String>,
    /// Whether this is the bundle's single "current" channel.
    pub current: bool,
    /// Whether this channel should be considered at all.
    pub visible: bool,
    /// Whether this is a release or prerelease track.
    pub channel_type: ChannelType,
    /// When this channel was created.
    pub created_timestamp: DateTime<Utc>,
    /// When this channel's manifest was last updated.
    pub last_updated_timestamp: DateTime<Utc>,

    releases: Vec<Release>,
    package_rules: Vec<PackageRules>,
    loaded: bool,
}

/// A channel's stability tier, used to firewall dependency resolution
/// (see the resolution engine's channel-type policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// A stable release track.
    #[default]
    Release,
    /// A pre-release track; only consulted when a dependent is itself
    /// on a prerelease channel.
    Prerelease,
}

/// A channel's entry within its owning bundle's manifest: everything
/// eager, before `releases`/`package_rules` are loaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelEntry {
    /// See [`Channel::name`].
    pub name: String,
    /// See [`Channel::manifest_url`].
    pub manifest_file: String,
    /// See [`Channel::created_timestamp`].
    pub created_timestamp: DateTime<Utc>,
    /// See [`Channel::last_updated_timestamp`].
    pub last_updated_timestamp: DateTime<Utc>,
    /// See [`Channel::latest_version`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latest_version: Option<String>,
    /// See [`Channel::current`].
    #[serde(default)]
    pub current: bool,
    /// See [`Channel::visible`].
    #[serde(default = "default_true")]
    pub visible: bool,
    /// See [`Channel::channel_type`].
    #[serde(default, skip_serializing_if = "is_default_channel_type")]
    pub channel_type: ChannelType,
}

fn is_default_channel_type(channel_type: &ChannelType) -> bool {
    *channel_type == ChannelType::default()
}

pub(crate) fn default_true() -> bool {
    true
}

/// The wire shape of a channel's own manifest file: just the lazy
/// fields.
#[derive(Debug, Deserialize, Serialize)]
struct ChannelManifest {
    #[serde(default)]
    format_version: String,
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(default)]
    package_rules: Vec<PackageRules>,
}

impl Channel {
    /// Construct an unloaded channel from its bundle-manifest entry,
    /// resolving its absolute manifest URL against the bundle's.
    pub(crate) fn from_entry(
        entry: &ChannelEntry,
        bundle_absolute_manifest_url: &str,
    ) -> Result<Self, RbpkgError> {
        let absolute = resolve(bundle_absolute_manifest_url, &entry.manifest_file)?;

        Ok(Self {
            name: entry.name.clone(),
            manifest_url: entry.manifest_file.clone(),
            absolute_manifest_url: absolute.to_string(),
            latest_version: entry.latest_version.clone(),
            current: entry.current,
            visible: entry.visible,
            channel_type: entry.channel_type,
            created_timestamp: entry.created_timestamp,
            last_updated_timestamp: entry.last_updated_timestamp,
            releases: Vec::new(),
            package_rules: Vec::new(),
            loaded: false,
        })
    }

    /// Whether [`Channel::load`] has already populated the lazy fields.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fetches and parses the channel manifest, populating `releases`
    /// and `package_rules`. A no-op if already loaded.
    pub fn load(&mut self, loader: &dyn DataLoader) -> Result<(), RbpkgError> {
        if self.loaded {
            return Ok(());
        }

        let url = parse_absolute(&self.absolute_manifest_url)?;
        let parts = path_parts(&url);
        let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        tracing::debug!(channel = %self.name, url = %url, "loading channel manifest");
        let document = loader.load_by_path(&part_refs)?;

        let manifest: ChannelManifest = serde_json::from_value(document).map_err(|e| {
            rbpkg_errors::LoadDataError::new(format!(
                "Unable to parse channel manifest for \"{}\": {e}",
                self.name
            ))
        })?;

        self.releases = manifest.releases;
        self.package_rules = manifest.package_rules;
        self.loaded = true;
        Ok(())
    }

    /// This channel's releases, newest first, loading on first access.
    pub fn releases(&mut self, loader: &dyn DataLoader) -> Result<&[Release], RbpkgError> {
        self.load(loader)?;
        Ok(&self.releases)
    }

    /// This channel's package rules, in manifest order, loading on first
    /// access.
    pub fn package_rules(&mut self, loader: &dyn DataLoader) -> Result<&[PackageRules], RbpkgError> {
        self.load(loader)?;
        Ok(&self.package_rules)
    }

    /// The first element of `releases`, if any.
    pub fn latest_release(&mut self, loader: &dyn DataLoader) -> Result<Option<&Release>, RbpkgError> {
        self.load(loader)?;
        Ok(self.releases.first())
    }

    /// Rules whose `version_range` matches `version` and, when
    /// `require_current_system` is set, whose `systems` matches the
    /// host. Preserves manifest order.
    pub fn get_all_rules_for_version(
        &mut self,
        loader: &dyn DataLoader,
        version: &str,
        require_current_system: bool,
    ) -> Result<Vec<&PackageRules>, RbpkgError> {
        self.load(loader)?;
        Ok(self
            .package_rules
            .iter()
            .filter(|rules| rules.matches(version, require_current_system))
            .collect())
    }

    /// Serializes this channel's bundle-manifest entry (the eager
    /// fields only).
    pub fn serialize_entry(&self) -> ChannelEntry {
        ChannelEntry {
            name: self.name.clone(),
            manifest_file: self.manifest_url.clone(),
            created_timestamp: self.created_timestamp,
            last_updated_timestamp: self.last_updated_timestamp,
            latest_version: self.latest_version.clone(),
            current: self.current,
            visible: self.visible,
            channel_type: self.channel_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbpkg_loader::InMemoryDataLoader;
    use std::collections::HashMap;

    fn entry() -> ChannelEntry {
        ChannelEntry {
            name: "1.0.x".to_string(),
            manifest_file: "1.0.x.json".to_string(),
            created_timestamp: Utc::now(),
            last_updated_timestamp: Utc::now(),
            latest_version: Some("1.0.2".to_string()),
            current: true,
            visible: true,
            channel_type: ChannelType::Release,
        }
    }

    #[test]
    fn loads_releases_and_rules_on_first_access() {
        let mut docs = HashMap::new();
        docs.insert(
            "packages/widget/1.0.x.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "releases": [{"version": "1.0.2"}],
                "package_rules": [{
                    "version_range": "*",
                    "package_type": "rpm",
                    "package_name": "widget",
                }],
            }),
        );
        let loader = InMemoryDataLoader::new(docs);

        let mut channel =
            Channel::from_entry(&entry(), "https://repository.invalid/packages/widget/index.json")
                .unwrap();
        assert!(!channel.is_loaded());

        let releases = channel.releases(&loader).unwrap();
        assert_eq!(releases.len(), 1);
        assert!(channel.is_loaded());

        let rules = channel.get_all_rules_for_version(&loader, "1.0.2", false).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn entry_round_trips() {
        let original = entry();
        let value = serde_json::to_value(&original).unwrap();
        let round_tripped: ChannelEntry = serde_json::from_value(value).unwrap();
        assert_eq!(round_tripped.name, original.name);
        assert_eq!(round_tripped.channel_type, original.channel_type);
    }
}
