use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::utils::validation::{normalize_key, type_key};

/// File name of the index artifact, written at the root of the catalog
pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Error, Debug)]
pub enum TypeIndexError {
    #[error("Failed to read index: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse index: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Where a resource type lives: which chunk, and which record inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLocation {
    /// Chunk path relative to the catalog root, forward slashes, lower-cased
    pub relative_path: String,

    /// Position of the resource record within the chunk
    pub index: usize,
}

impl TypeLocation {
    pub fn new(relative_path: impl Into<String>, index: usize) -> Self {
        Self {
            relative_path: relative_path.into(),
            index,
        }
    }
}

/// Serialized index format: `"<name>@<apiVersion>"` → location
type IndexData = BTreeMap<String, TypeLocation>;

/// Catalog-wide lookup table from `name@apiVersion` to a chunk location.
///
/// Keys keep the casing they were first inserted with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexData", into = "IndexData")]
pub struct TypeIndex {
    /// Display key -> location
    entries: BTreeMap<String, TypeLocation>,

    /// Case-folded key -> display key
    folded: HashMap<String, String>,
}

impl TypeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry unless a key equal ignoring case already exists.
    ///
    /// Returns the existing location when the key is taken; the index is
    /// left unchanged in that case.
    pub fn try_insert(
        &mut self,
        key: impl Into<String>,
        location: TypeLocation,
    ) -> Result<(), &TypeLocation> {
        let key = key.into();
        let folded = normalize_key(&key);

        if let Some(existing) = self.folded.get(&folded).cloned() {
            return Err(&self.entries[&existing]);
        }

        self.folded.insert(folded, key.clone());
        self.entries.insert(key, location);
        Ok(())
    }

    /// Look up a key, ignoring case
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TypeLocation> {
        self.folded
            .get(&normalize_key(key))
            .and_then(|display| self.entries.get(display))
    }

    /// Look up a resource type at an api version, ignoring case
    #[must_use]
    pub fn find(&self, resource_type: &str, api_version: &str) -> Option<&TypeLocation> {
        self.get(&type_key(resource_type, api_version))
    }

    /// Keys in their original casing, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeLocation)> {
        self.entries.iter().map(|(key, location)| (key.as_str(), location))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an index artifact
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a valid index.
    pub fn from_json(json: &str) -> Result<Self, TypeIndexError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse an index artifact from raw bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a valid index.
    pub fn from_slice(json: &[u8]) -> Result<Self, TypeIndexError> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Render the index artifact
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, TypeIndexError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from an index file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self, TypeIndexError> {
        let content = std::fs::read(path)?;
        Self::from_slice(&content)
    }

    /// Save to an index file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<(), TypeIndexError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl From<IndexData> for TypeIndex {
    fn from(data: IndexData) -> Self {
        let mut index = Self::new();
        for (key, location) in data {
            if let Err(existing) = index.try_insert(key.clone(), location) {
                warn!(
                    key = %key,
                    existing = %existing.relative_path,
                    "Index contains keys differing only in case, keeping the first"
                );
            }
        }
        index
    }
}

impl From<TypeIndex> for IndexData {
    fn from(index: TypeIndex) -> Self {
        index.entries
    }
}
