use std::collections::HashMap;

use rbpkg_errors::LoadDataError;
use serde_json::Value;

use crate::DataLoader;

/// A data loader backed by a fixed mapping of path to pre-parsed content.
///
/// Intended for unit tests and for the fixture builders in `rbpkg_testing`,
/// where it's useful to hand back pre-computed documents for known paths
/// without touching the filesystem or the network.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDataLoader {
    path_to_content: HashMap<String, Value>,
}

impl InMemoryDataLoader {
    /// Construct a loader from a path → document mapping.
    pub fn new(path_to_content: HashMap<String, Value>) -> Self {
        Self { path_to_content }
    }

    /// Construct an empty loader; documents can be added with [`Self::insert`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the document returned for a given path.
    pub fn insert(&mut self, path: impl Into<String>, document: Value) -> &mut Self {
        self.path_to_content.insert(path.into(), document);
        self
    }
}

impl DataLoader for InMemoryDataLoader {
    fn load_by_path(&self, parts: &[&str]) -> Result<Value, LoadDataError> {
        let path = parts.join("/");

        self.path_to_content
            .get(&path)
            .cloned()
            .ok_or_else(|| LoadDataError::new(format!("Unable to load \"{path}\": not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_registered_document() {
        let mut loader = InMemoryDataLoader::empty();
        loader.insert("packages/index.json", serde_json::json!({"bundles": []}));

        let doc = loader.load_by_path(&["packages", "index.json"]).unwrap();
        assert_eq!(doc["bundles"], serde_json::json!([]));
    }

    #[test]
    fn missing_path_is_load_data_error() {
        let loader = InMemoryDataLoader::empty();
        let err = loader.load_by_path(&["nope"]).unwrap_err();
        assert!(err.0.contains("nope"));
    }
}
