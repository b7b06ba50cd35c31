use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rbpkg_errors::RbpkgError;
use rbpkg_loader::DataLoader;
use serde::{Deserialize, Serialize};

/// The repository root manifest: one document listing every bundle's
/// light index-entry projection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Index {
    /// The manifest format version, currently always `"1.0"`.
    #[serde(default)]
    pub format_version: String,
    /// When this index was last regenerated.
    pub last_updated_timestamp: DateTime<Utc>,
    /// Every bundle in the repository, in manifest order.
    pub bundles: Vec<IndexEntry>,
}

/// The light projection of a [`crate::Bundle`] carried in the index,
/// before any of the bundle's own manifest has been fetched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndexEntry {
    /// Unique name within the repository.
    pub name: String,
    /// The bundle manifest's URL, relative to the repository root.
    pub manifest_file: String,
    /// When this bundle was first added to the repository.
    pub created_timestamp: DateTime<Utc>,
    /// When this bundle's manifest was last updated.
    pub last_updated_timestamp: DateTime<Utc>,
    /// The bundle's current version, if it has one yet.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_version: Option<String>,
    /// Platform → package-name hints, aggregated across the bundle's
    /// channels.
    #[serde(default)]
    pub package_names: HashMap<String, String>,
}

impl Index {
    /// Fetches and parses the index manifest at `/packages/index.json`.
    pub fn load(loader: &dyn DataLoader) -> Result<Self, RbpkgError> {
        tracing::debug!("loading repository index");
        let document = loader.load_by_path(&["packages", "index.json"])?;
        let index: Index = serde_json::from_value(document).map_err(|e| {
            rbpkg_errors::LoadDataError::new(format!("Unable to parse repository index: {e}"))
        })?;
        Ok(index)
    }

    /// Finds a bundle's index entry by name.
    pub fn bundle_entry(&self, name: &str) -> Option<&IndexEntry> {
        self.bundles.iter().find(|entry| entry.name == name)
    }

    /// Serializes this index back to its wire form.
    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Index always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbpkg_loader::InMemoryDataLoader;
    use std::collections::HashMap as Map;

    #[test]
    fn loads_and_finds_bundle_entries() {
        let mut docs = Map::new();
        docs.insert(
            "packages/index.json".to_string(),
            serde_json::json!({
                "format_version": "1.0",
                "last_updated_timestamp": Utc::now(),
                "bundles": [
                    {
                        "name": "widget",
                        "manifest_file": "widget/index.json",
                        "created_timestamp": Utc::now(),
                        "last_updated_timestamp": Utc::now(),
                        "current_version": "1.0.0",
                        "package_names": {},
                    }
                ],
            }),
        );
        let loader = InMemoryDataLoader::new(docs);

        let index = Index::load(&loader).unwrap();
        assert_eq!(index.bundles.len(), 1);
        assert_eq!(index.bundle_entry("widget").unwrap().current_version, Some("1.0.0".to_string()));
        assert!(index.bundle_entry("missing").is_none());
    }

    #[test]
    fn round_trips_through_serialize_and_deserialize() {
        let original = Index {
            format_version: "1.0".to_string(),
            last_updated_timestamp: Utc::now(),
            bundles: vec![IndexEntry {
                name: "widget".to_string(),
                manifest_file: "widget/index.json".to_string(),
                created_timestamp: Utc::now(),
                last_updated_timestamp: Utc::now(),
                current_version: None,
                package_names: Map::new(),
            }],
        };
        let value = original.serialize();
        let round_tripped: Index = serde_json::from_value(value).unwrap();
        assert_eq!(round_tripped.bundles, original.bundles);
    }
}
