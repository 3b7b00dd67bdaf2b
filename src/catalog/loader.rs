use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::index::{TypeIndex, TypeIndexError};
use crate::catalog::source::{ChunkSource, DirectorySource};
use crate::core::reference::{TypeGraph, TypeRef};
use crate::core::types::{ResourceType, TypeBase};
use crate::serialized::{self, FormatError};
use crate::utils::validation::ValidationError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load type index: {0}")]
    Index(#[from] TypeIndexError),

    #[error("Failed to decode chunk {path}: {source}")]
    Chunk {
        path: String,
        #[source]
        source: FormatError,
    },

    #[error("Chunk {0} is listed in the index but could not be found")]
    MissingChunk(String),

    #[error(transparent)]
    InvalidPath(#[from] ValidationError),
}

/// A resource type resolved from the catalog.
///
/// Holds the whole decoded chunk so the resource body and everything it
/// references can be walked with [`Self::graph`].
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    graph: Arc<TypeGraph>,
    handle: TypeRef,
    resource: ResourceType,
}

impl ResolvedResource {
    #[must_use]
    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.resource.name
    }

    #[must_use]
    pub fn body(&self) -> &TypeBase {
        self.graph.resolve(self.resource.body)
    }

    /// Position of the resource within its chunk
    #[must_use]
    pub fn handle(&self) -> TypeRef {
        self.handle
    }

    #[must_use]
    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Whether two results share the same decoded chunk
    #[must_use]
    pub fn same_chunk(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }
}

type ChunkCell = Arc<OnceCell<Arc<TypeGraph>>>;

/// On-demand access to a built catalog.
///
/// The index is read once, on first use. A chunk is read and decoded the
/// first time any type inside it is resolved, then kept for the lifetime of
/// the loader. Both steps are guarded so concurrent first calls do the work
/// once and never observe a half-populated entry.
pub struct TypeLoader<S> {
    source: S,
    index: OnceCell<TypeIndex>,
    chunks: Mutex<HashMap<String, ChunkCell>>,
}

impl TypeLoader<DirectorySource> {
    /// Loader over a catalog directory containing `index.json`
    pub fn from_dir(base_dir: impl AsRef<Path>) -> Self {
        Self::new(DirectorySource::new(base_dir.as_ref()))
    }
}

impl<S: ChunkSource> TypeLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            index: OnceCell::new(),
            chunks: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The catalog index, loaded on first call
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or parsed.
    pub fn index(&self) -> Result<&TypeIndex, LoadError> {
        self.index.get_or_try_init(|| {
            let content = self.source.read_index()?;
            let index = TypeIndex::from_slice(&content)?;
            debug!(entries = index.len(), "Loaded type index");
            Ok(index)
        })
    }

    /// Resolve a resource type at an api version, ignoring case.
    ///
    /// Returns `Ok(None)` when the key is not in the index, or when the
    /// indexed position does not hold a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or the owning chunk cannot be loaded.
    pub fn resolve(
        &self,
        resource_type: &str,
        api_version: &str,
    ) -> Result<Option<ResolvedResource>, LoadError> {
        let Some(location) = self.index()?.find(resource_type, api_version) else {
            return Ok(None);
        };

        let graph = self.load_chunk(&location.relative_path)?;
        let handle = TypeRef::from_index(location.index);

        let Some(resource) = graph.get(handle).and_then(TypeBase::as_resource) else {
            warn!(
                resource_type,
                api_version,
                chunk = %location.relative_path,
                index = location.index,
                "Index entry does not point at a resource"
            );
            return Ok(None);
        };

        Ok(Some(ResolvedResource {
            resource: resource.clone(),
            graph,
            handle,
        }))
    }

    /// Every `name@apiVersion` key in the index. Does not read any chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be loaded.
    pub fn list_available(&self) -> Result<BTreeSet<String>, LoadError> {
        Ok(self.index()?.keys().map(str::to_string).collect())
    }

    /// Number of chunks decoded so far
    pub fn loaded_chunk_count(&self) -> usize {
        self.chunks
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// Whether the chunk at `relative_path` has been decoded
    pub fn is_chunk_loaded(&self, relative_path: &str) -> bool {
        self.chunks
            .lock()
            .get(relative_path)
            .is_some_and(|cell| cell.get().is_some())
    }

    fn load_chunk(&self, relative_path: &str) -> Result<Arc<TypeGraph>, LoadError> {
        // The map lock only hands out the cell; decoding happens outside it so
        // different chunks can load in parallel.
        let cell = Arc::clone(
            self.chunks
                .lock()
                .entry(relative_path.to_string())
                .or_default(),
        );

        cell.get_or_try_init(|| {
            let content = self.source.read_chunk(relative_path)?;
            let graph =
                serialized::deserialize_slice(&content).map_err(|source| LoadError::Chunk {
                    path: relative_path.to_string(),
                    source,
                })?;
            debug!(chunk = relative_path, types = graph.len(), "Loaded chunk");
            Ok(Arc::new(graph))
        })
        .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::MemorySource;

    const INDEX: &str = r#"{
        "Foo.Bar/baz@2021-01-01": {"relativePath": "foo.bar/2021-01-01/types.json", "index": 1},
        "Foo.Bar/broken@2021-01-01": {"relativePath": "foo.bar/2021-01-01/types.json", "index": 0},
        "Foo.Bar/far@2021-01-01": {"relativePath": "foo.bar/2021-01-01/types.json", "index": 42},
        "Foo.Bar/gone@2021-01-01": {"relativePath": "foo.bar/missing/types.json", "index": 0}
    }"#;

    const CHUNK: &str = r#"[{"6":{}},{"12":{"name":"Foo.Bar/baz","body":0}}]"#;

    fn loader() -> TypeLoader<MemorySource> {
        TypeLoader::new(
            MemorySource::new(INDEX).with_chunk("foo.bar/2021-01-01/types.json", CHUNK),
        )
    }

    #[test]
    fn test_resolve() {
        let loader = loader();
        let resolved = loader.resolve("Foo.Bar/baz", "2021-01-01").unwrap().unwrap();
        assert_eq!(resolved.name(), "Foo.Bar/baz");
        assert_eq!(resolved.handle(), TypeRef::from_index(1));
        assert_eq!(resolved.body(), &TypeBase::builtin(crate::core::BuiltInTypeKind::String));
    }

    #[test]
    fn test_resolve_miss_is_not_an_error() {
        let loader = loader();
        assert!(loader.resolve("nonexistent/type", "2021-01-01").unwrap().is_none());
        assert_eq!(loader.loaded_chunk_count(), 0);
    }

    #[test]
    fn test_wrong_kind_or_out_of_range_is_not_found() {
        let loader = loader();
        assert!(loader.resolve("Foo.Bar/broken", "2021-01-01").unwrap().is_none());
        assert!(loader.resolve("Foo.Bar/far", "2021-01-01").unwrap().is_none());
    }

    #[test]
    fn test_missing_chunk_is_an_error() {
        let loader = loader();
        let err = loader.resolve("Foo.Bar/gone", "2021-01-01").unwrap_err();
        assert!(matches!(err, LoadError::MissingChunk(_)));
        assert!(!loader.is_chunk_loaded("foo.bar/missing/types.json"));
    }

    #[test]
    fn test_list_available_does_not_load_chunks() {
        let loader = loader();
        let keys = loader.list_available().unwrap();
        assert_eq!(keys.len(), 4);
        assert!(keys.contains("Foo.Bar/baz@2021-01-01"));
        assert_eq!(loader.loaded_chunk_count(), 0);
    }

    #[test]
    fn test_corrupt_index() {
        let loader = TypeLoader::new(MemorySource::new("not json"));
        assert!(matches!(
            loader.resolve("a", "b").unwrap_err(),
            LoadError::Index(_)
        ));
    }

    #[test]
    fn test_corrupt_chunk() {
        let loader = TypeLoader::new(
            MemorySource::new(INDEX).with_chunk("foo.bar/2021-01-01/types.json", r#"[{"0":{}}]"#),
        );
        let err = loader.resolve("Foo.Bar/baz", "2021-01-01").unwrap_err();
        assert!(matches!(err, LoadError::Chunk { .. }));
        assert_eq!(loader.loaded_chunk_count(), 0);
    }
}
