use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rbpkg_errors::RbpkgError;
use rbpkg_loader::DataLoader;
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelEntry, ChannelType};
use crate::index::IndexEntry;
use crate::release::Release;
use crate::urls::{parse_absolute, path_parts, resolve, REPOSITORY_BASE_URL};

/// A collection of [`Channel`]s for one logical product.
///
/// `description`, `channel_aliases`, and `channels` are lazy: they're
/// empty/default and [`Bundle::is_loaded`] is `false` until the first
/// call to [`Bundle::load`] or one of the lazy accessors.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Unique name within the repository.
    pub name: String,
    /// The bundle manifest's URL, relative to the repository root.
    pub manifest_url: String,
    /// `manifest_url` resolved against the repository base URL.
    pub absolute_manifest_url: String,
    /// When this bundle was first added to the repository.
    pub created_timestamp: DateTime<Utc>,
    /// When this bundle's manifest was last updated.
    pub last_updated_timestamp: DateTime<Utc>,
    /// The bundle's current version, mirrored from the index so it's
    /// available without a load.
    pub current_version: Option<String>,
    /// Platform → package-name hints, mirrored from the index.
    pub package_names: HashMap<String, String>,

    description: Option<String>,
    channel_aliases: HashMap<String, String>,
    channels: Vec<Channel>,
    loaded: bool,
}

/// The wire shape of a bundle's own manifest file.
#[derive(Debug, Deserialize, Serialize)]
struct BundleManifest {
    #[serde(default)]
    format_version: String,
    name: String,
    #[serde(default)]
    created_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    description: Vec<String>,
    #[serde(default)]
    current_version: Option<String>,
    #[serde(default)]
    package_names: HashMap<String, String>,
    #[serde(default)]
    channel_aliases: HashMap<String, String>,
    #[serde(default)]
    channels: Vec<ChannelEntry>,
}

impl Bundle {
    /// Construct an unloaded bundle from its index entry, resolving its
    /// absolute manifest URL against the repository base.
    pub(crate) fn from_index_entry(entry: &IndexEntry) -> Result<Self, RbpkgError> {
        let absolute = resolve(REPOSITORY_BASE_URL, &entry.manifest_file)?;

        Ok(Self {
            name: entry.name.clone(),
            manifest_url: entry.manifest_file.clone(),
            absolute_manifest_url: absolute.to_string(),
            created_timestamp: entry.created_timestamp,
            last_updated_timestamp: entry.last_updated_timestamp,
            current_version: entry.current_version.clone(),
            package_names: entry.package_names.clone(),
            description: None,
            channel_aliases: HashMap::new(),
            channels: Vec::new(),
            loaded: false,
        })
    }

    /// Whether [`Bundle::load`] has already populated the lazy fields.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fetches and parses the bundle manifest, populating `description`,
    /// `channel_aliases`, and `channels`, and refreshing the eager
    /// fields from the manifest (the authoritative source, vs. the
    /// index's cached projection). A no-op if already loaded.
    pub fn load(&mut self, loader: &dyn DataLoader) -> Result<(), RbpkgError> {
        if self.loaded {
            return Ok(());
        }

        let url = parse_absolute(&self.absolute_manifest_url)?;
        let parts = path_parts(&url);
        let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        tracing::debug!(bundle = %self.name, url = %url, "loading bundle manifest");
        let document = loader.load_by_path(&part_refs)?;

        let manifest: BundleManifest = serde_json::from_value(document).map_err(|e| {
            rbpkg_errors::LoadDataError::new(format!(
                "Unable to parse bundle manifest for \"{}\": {e}",
                self.name
            ))
        })?;

        let mut channels = Vec::with_capacity(manifest.channels.len());
        for entry in &manifest.channels {
            channels.push(Channel::from_entry(entry, &self.absolute_manifest_url)?);
        }

        if let Some(created) = manifest.created_timestamp {
            self.created_timestamp = created;
        }
        if let Some(updated) = manifest.last_updated_timestamp {
            self.last_updated_timestamp = updated;
        }
        self.current_version = manifest.current_version;
        self.package_names = manifest.package_names;
        self.description = Some(manifest.description.join("\n"));
        self.channel_aliases = manifest.channel_aliases;
        self.channels = channels;
        self.loaded = true;
        Ok(())
    }

    /// The bundle's description, lines joined with `\n`, loading on
    /// first access.
    pub fn description(&mut self, loader: &dyn DataLoader) -> Result<&str, RbpkgError> {
        self.load(loader)?;
        Ok(self.description.as_deref().unwrap_or(""))
    }

    /// The alias → channel-name mapping, loading on first access.
    pub fn channel_aliases(
        &mut self,
        loader: &dyn DataLoader,
    ) -> Result<&HashMap<String, String>, RbpkgError> {
        self.load(loader)?;
        Ok(&self.channel_aliases)
    }

    /// This bundle's channels, loading on first access.
    pub fn channels(&mut self, loader: &dyn DataLoader) -> Result<&[Channel], RbpkgError> {
        self.load(loader)?;
        Ok(&self.channels)
    }

    /// Looks up a channel by name or alias, loading on first access.
    pub fn get_channel(
        &mut self,
        loader: &dyn DataLoader,
        name_or_alias: &str,
    ) -> Result<Option<&mut Channel>, RbpkgError> {
        self.load(loader)?;
        let resolved_name = self
            .channel_aliases
            .get(name_or_alias)
            .map(String::as_str)
            .unwrap_or(name_or_alias)
            .to_string();
        Ok(self.channels.iter_mut().find(|c| c.name == resolved_name))
    }

    /// The single channel whose `current` flag is set, if any. Does not
    /// require a load beyond what's already been done, since `current`
    /// is an eager field on each channel entry.
    pub fn current_channel(&mut self, loader: &dyn DataLoader) -> Result<Option<&mut Channel>, RbpkgError> {
        self.load(loader)?;
        Ok(self.channels.iter_mut().find(|c| c.current))
    }

    /// Across channels whose type is in `channel_types`, finds the
    /// highest-versioned visible release satisfying `range`.
    ///
    /// # Errors
    ///
    /// Returns [`rbpkg_errors::PackageLookupError`] when no candidate
    /// release qualifies.
    pub fn get_latest_release_for_version_range(
        &mut self,
        loader: &dyn DataLoader,
        range: &str,
        channel_types: &[ChannelType],
    ) -> Result<ResolvedRelease, RbpkgError> {
        self.load(loader)?;

        let mut best: Option<(pep440_rs::Version, ResolvedRelease)> = None;

        for channel in &mut self.channels {
            if !channel_types.contains(&channel.channel_type) {
                continue;
            }
            channel.load(loader)?;

            for release in channel.releases(loader)? {
                if !release.visible {
                    continue;
                }
                if !rbpkg_matcher::matches_version_range(&release.version, range, None) {
                    continue;
                }
                let Ok(parsed) = release.version.parse::<pep440_rs::Version>() else {
                    continue;
                };

                let is_better = match &best {
                    Some((current_best, _)) => parsed > *current_best,
                    None => true,
                };
                if is_better {
                    best = Some((
                        parsed,
                        ResolvedRelease {
                            channel_name: channel.name.clone(),
                            channel_type: channel.channel_type,
                            release: release.clone(),
                        },
                    ));
                }
            }
        }

        best.map(|(_, resolved)| resolved).ok_or_else(|| {
            rbpkg_errors::PackageLookupError::new(format!(
                "No release of bundle \"{}\" satisfies \"{range}\"",
                self.name
            ))
            .into()
        })
    }

    /// Serializes this bundle's light index-entry projection.
    pub fn serialize_index_entry(&self) -> IndexEntry {
        IndexEntry {
            name: self.name.clone(),
            manifest_file: self.manifest_url.clone(),
            created_timestamp: self.created_timestamp,
            last_updated_timestamp: self.last_updated_timestamp,
            current_version: self.current_version.clone(),
            package_names: self.package_names.clone(),
        }
    }

    /// Serializes this bundle's full manifest, including the lazy
    /// fields. If called before [`Bundle::load`], the lazy fields
    /// serialize empty rather than reflecting manifest content;
    /// callers that intend to round-trip a bundle should load it first.
    pub fn serialize(&self) -> serde_json::Value {
        let manifest = BundleManifest {
            format_version: "1.0".to_string(),
            name: self.name.clone(),
            created_timestamp: Some(self.created_timestamp),
            last_updated_timestamp: Some(self.last_updated_timestamp),
            description: self
                .description
                .as_deref()
                .unwrap_or("")
                .lines()
                .map(str::to_string)
                .collect(),
            current_version: self.current_version.clone(),
            package_names: self.package_names.clone(),
            channel_aliases: self.channel_aliases.clone(),
            channels: self.channels.iter().map(Channel::serialize_entry).collect(),
        };
        serde_json::to_value(manifest).expect("BundleManifest always serializes")
    }
}

/// A release resolved from a bundle, paired with the name of the
/// channel it came from (back-references are lookup-only in this
/// crate's model, so the channel is named rather than pointed to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    /// The channel the release was found on.
    pub channel_name: String,
    /// The stability tier of the channel the release was found on, so
    /// callers don't need a second lookup to apply the channel-type
    /// firewall to this release's own transitive dependencies.
    pub channel_type: ChannelType,
    /// The resolved release itself.
    pub release: Release,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseType;
    use rbpkg_loader::InMemoryDataLoader;
    use std::collections::HashMap as Map;

    fn index_entry() -> IndexEntry {
        IndexEntry {
            name: "widget".to_string(),
            manifest_file: "widget/index.json".to_string(),
            created_timestamp: Utc::now(),
            last_updated_timestamp: Utc::now(),
            current_version: Some("1.0.0".to_string()),
            package_names: Map::new(),
        }
    }

    fn loader_with_channels() -> InMemoryDataLoader {
        let mut docs = Map::new();
        docs.insert(
            "packages/widget/index.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "name": "widget",
                "description": ["line one", "line two"],
                "current_version": "1.5",
                "package_names": {},
                "channel_aliases": {"stable": "1.x"},
                "channels": [
                    {
                        "name": "1.x",
                        "manifest_file": "1.x.json",
                        "created_timestamp": Utc::now(),
                        "last_updated_timestamp": Utc::now(),
                        "latest_version": "1.5",
                        "current": true,
                        "visible": true,
                        "channel_type": "release",
                    },
                    {
                        "name": "2.x",
                        "manifest_file": "2.x.json",
                        "created_timestamp": Utc::now(),
                        "last_updated_timestamp": Utc::now(),
                        "latest_version": "2.0",
                        "current": false,
                        "visible": true,
                        "channel_type": "prerelease",
                    },
                ],
            }),
        );
        docs.insert(
            "packages/widget/1.x.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "releases": [{"version": "1.5"}],
                "package_rules": [],
            }),
        );
        docs.insert(
            "packages/widget/2.x.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "releases": [{"version": "2.0", "type": "beta"}],
                "package_rules": [],
            }),
        );
        InMemoryDataLoader::new(docs)
    }

    #[test]
    fn load_populates_description_and_channels() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();
        assert!(!bundle.is_loaded());

        assert_eq!(bundle.description(&loader).unwrap(), "line one\nline two");
        assert_eq!(bundle.channels(&loader).unwrap().len(), 2);
    }

    #[test]
    fn get_channel_resolves_aliases() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();
        let channel = bundle.get_channel(&loader, "stable").unwrap().unwrap();
        assert_eq!(channel.name, "1.x");
    }

    #[test]
    fn current_channel_finds_the_flagged_channel() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();
        let channel = bundle.current_channel(&loader).unwrap().unwrap();
        assert_eq!(channel.name, "1.x");
    }

    #[test]
    fn release_channel_firewall_restricts_to_release_channels_by_default() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();

        let resolved = bundle
            .get_latest_release_for_version_range(&loader, ">=1.0", &[ChannelType::Release])
            .unwrap();
        assert_eq!(resolved.channel_name, "1.x");
        assert_eq!(resolved.release.version, "1.5");
    }

    #[test]
    fn prerelease_parent_admits_prerelease_channels() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();

        let resolved = bundle
            .get_latest_release_for_version_range(
                &loader,
                ">=1.0",
                &[ChannelType::Release, ChannelType::Prerelease],
            )
            .unwrap();
        assert_eq!(resolved.channel_name, "2.x");
        assert_eq!(resolved.release.version, "2.0");
        assert_eq!(resolved.release.release_type, ReleaseType::Beta);
    }

    #[test]
    fn no_satisfying_release_is_a_package_lookup_error() {
        let loader = loader_with_channels();
        let mut bundle = Bundle::from_index_entry(&index_entry()).unwrap();

        let err = bundle
            .get_latest_release_for_version_range(&loader, ">=9.0", &[ChannelType::Release])
            .unwrap_err();
        assert!(matches!(err, RbpkgError::PackageLookup(_)));
    }
}
