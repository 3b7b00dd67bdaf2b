//! Index builder for creating the catalog index from chunk files.
//!
//! The `IndexBuilder` walks a catalog directory, decodes every chunk it finds,
//! and records where each top-level resource type lives. Chunks are laid out
//! as `<provider namespace>/<api version>/types.json`; the api version of a
//! chunk is the name of the directory that contains it.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::index::{TypeIndex, TypeIndexError, TypeLocation, INDEX_FILE_NAME};
use crate::core::reference::TypeGraph;
use crate::serialized::{self, FormatError};
use crate::utils::validation::{normalize_relative_path, type_key};

/// File name of every chunk in a catalog
pub const CHUNK_FILE_NAME: &str = "types.json";

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Invalid catalog directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to scan catalog directory: {0}")]
    Scan(#[from] glob::GlobError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode chunk {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("Found resource with no name at index {index} of {relative_path}")]
    MissingResourceName { relative_path: String, index: usize },

    #[error("Unable to compute a chunk path and api version for {}", .path.display())]
    MissingChunkPath { path: PathBuf },

    #[error("Failed to write index: {0}")]
    Index(#[from] TypeIndexError),
}

/// A resource type that was skipped because its key was already indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateType {
    pub key: String,
    pub location: TypeLocation,
    pub existing: TypeLocation,
}

/// Record of a processed chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub relative_path: String,
    pub api_version: String,
    pub types_found: usize,
    pub resources_indexed: usize,
}

/// Result of an index build
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub index: TypeIndex,
    pub chunks: Vec<ChunkRecord>,
    pub duplicates: Vec<DuplicateType>,
}

/// Builder that collates resource locations from many chunks
pub struct IndexBuilder {
    base_dir: PathBuf,
    index: TypeIndex,
    chunks: Vec<ChunkRecord>,
    duplicates: Vec<DuplicateType>,
}

impl IndexBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            index: TypeIndex::new(),
            chunks: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Find every chunk below the base directory, in lexicographic path order.
    ///
    /// The order decides which chunk wins when two define the same key, so it
    /// is pinned here rather than left to directory iteration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be scanned.
    pub fn discover_chunks(&self) -> Result<Vec<PathBuf>, BuilderError> {
        let base = glob::Pattern::escape(&self.base_dir.to_string_lossy());
        let pattern = format!("{base}/**/{CHUNK_FILE_NAME}");

        let mut paths = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
        paths.retain(|path| path.is_file());
        paths.sort();

        debug!(count = paths.len(), base_dir = %self.base_dir.display(), "Discovered chunks");
        Ok(paths)
    }

    /// Read, decode and index one chunk file
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk cannot be read or decoded, if its path
    /// does not yield a relative path and api version, or if it contains a
    /// resource without a name.
    pub fn add_chunk(&mut self, path: &Path) -> Result<(), BuilderError> {
        let missing_path = || BuilderError::MissingChunkPath {
            path: path.to_path_buf(),
        };

        let relative_path = normalize_relative_path(&self.base_dir, path)
            .or_else(|| {
                let base_dir = self.base_dir.canonicalize().ok()?;
                normalize_relative_path(&base_dir, &path.canonicalize().ok()?)
            })
            .ok_or_else(missing_path)?;
        let api_version = chunk_api_version(&relative_path, path)
            .ok_or_else(missing_path)?
            .to_string();

        let content = std::fs::read(path).map_err(|source| BuilderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let graph = serialized::deserialize_slice(&content).map_err(|source| BuilderError::Format {
            path: path.to_path_buf(),
            source,
        })?;

        self.add_graph(&relative_path, &api_version, &graph)
    }

    /// Index the resources of an already decoded chunk
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingResourceName` if a resource has an empty name.
    pub fn add_graph(
        &mut self,
        relative_path: &str,
        api_version: &str,
        graph: &TypeGraph,
    ) -> Result<(), BuilderError> {
        let mut record = ChunkRecord {
            relative_path: relative_path.to_string(),
            api_version: api_version.to_string(),
            types_found: graph.len(),
            resources_indexed: 0,
        };

        for (handle, resource) in graph.resources() {
            if resource.name.trim().is_empty() {
                return Err(BuilderError::MissingResourceName {
                    relative_path: relative_path.to_string(),
                    index: handle.index(),
                });
            }

            let key = type_key(&resource.name, api_version);
            let location = TypeLocation::new(relative_path, handle.index());

            match self.index.try_insert(key.clone(), location.clone()) {
                Ok(()) => record.resources_indexed += 1,
                Err(existing) => {
                    warn!(
                        key = %key,
                        chunk = %relative_path,
                        existing = %existing.relative_path,
                        "Found duplicate type, keeping the first definition"
                    );
                    self.duplicates.push(DuplicateType {
                        key,
                        location,
                        existing: existing.clone(),
                    });
                }
            }
        }

        self.chunks.push(record);
        Ok(())
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> IndexReport {
        info!(
            entries = self.index.len(),
            chunks = self.chunks.len(),
            duplicates = self.duplicates.len(),
            "Built type index"
        );

        IndexReport {
            index: self.index,
            chunks: self.chunks,
            duplicates: self.duplicates,
        }
    }
}

/// The api version of a chunk is the directory directly containing it, as
/// named on disk. `relative_path` is lower-cased, so it only decides whether
/// the chunk sits below the catalog root at all.
fn chunk_api_version<'a>(relative_path: &str, path: &'a Path) -> Option<&'a str> {
    if !relative_path.contains('/') {
        return None;
    }
    path.parent()?
        .file_name()?
        .to_str()
        .filter(|segment| !segment.is_empty())
}

/// Scan `base_dir` and build the index for every chunk found
///
/// # Errors
///
/// See [`IndexBuilder::add_chunk`]. A single bad chunk fails the whole build.
pub fn build_index(base_dir: &Path) -> Result<IndexReport, BuilderError> {
    let mut builder = IndexBuilder::new(base_dir);
    for path in builder.discover_chunks()? {
        builder.add_chunk(&path)?;
    }
    Ok(builder.build())
}

/// Build the index for `base_dir` and write it to `<base_dir>/index.json`
///
/// # Errors
///
/// See [`build_index`]; also fails if the index file cannot be written.
pub fn write_index(base_dir: &Path) -> Result<IndexReport, BuilderError> {
    let report = build_index(base_dir)?;
    report.index.save(&base_dir.join(INDEX_FILE_NAME))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::TypeFactory;
    use crate::core::types::{BuiltInTypeKind, ObjectType, ResourceType, TypeBase};

    fn write_chunk(base: &Path, relative: &str, content: &str) {
        let path = base.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn resource_graph(name: &str) -> TypeGraph {
        let mut factory = TypeFactory::new();
        let body = factory.create(TypeBase::Object(ObjectType::new("body")));
        factory.create(TypeBase::Resource(ResourceType::new(name, body)));
        factory.finish().unwrap()
    }

    #[test]
    fn test_chunk_api_version() {
        assert_eq!(
            chunk_api_version(
                "foo.bar/2021-01-01/types.json",
                Path::new("/catalog/Foo.Bar/2021-01-01/types.json")
            ),
            Some("2021-01-01")
        );
        assert_eq!(
            chunk_api_version(
                "foo.bar/2021-01-01-preview/types.json",
                Path::new("/catalog/Foo.Bar/2021-01-01-Preview/types.json")
            ),
            Some("2021-01-01-Preview")
        );
        assert_eq!(
            chunk_api_version("types.json", Path::new("/catalog/types.json")),
            None
        );
    }

    #[test]
    fn test_api_version_keeps_directory_casing() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(
            dir.path(),
            "Foo.Bar/2021-01-01-Preview/types.json",
            r#"[{"6":{}},{"12":{"name":"Foo.Bar/baz","body":0}}]"#,
        );

        let report = build_index(dir.path()).unwrap();
        let keys: Vec<&str> = report.index.keys().collect();
        assert_eq!(keys, ["Foo.Bar/baz@2021-01-01-Preview"]);
        assert_eq!(
            report.index.find("foo.bar/BAZ", "2021-01-01-preview"),
            Some(&TypeLocation::new("foo.bar/2021-01-01-preview/types.json", 1))
        );
        assert_eq!(report.chunks[0].api_version, "2021-01-01-Preview");
    }

    #[test]
    fn test_add_graph_records_positions() {
        let mut builder = IndexBuilder::new("/catalog");
        builder
            .add_graph("foo/v1/types.json", "v1", &resource_graph("Foo/bar"))
            .unwrap();
        let report = builder.build();

        assert_eq!(
            report.index.find("Foo/bar", "v1"),
            Some(&TypeLocation::new("foo/v1/types.json", 1))
        );
        assert_eq!(report.chunks[0].types_found, 2);
        assert_eq!(report.chunks[0].resources_indexed, 1);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut builder = IndexBuilder::new("/catalog");
        builder
            .add_graph("a/v1/types.json", "v1", &resource_graph("Foo/bar"))
            .unwrap();
        builder
            .add_graph("b/v1/types.json", "v1", &resource_graph("FOO/BAR"))
            .unwrap();
        let report = builder.build();

        assert_eq!(report.index.len(), 1);
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].key, "FOO/BAR@v1");
        assert_eq!(report.duplicates[0].existing.relative_path, "a/v1/types.json");
        assert_eq!(
            report.index.find("foo/bar", "v1").unwrap().relative_path,
            "a/v1/types.json"
        );
    }

    #[test]
    fn test_empty_resource_name_is_fatal() {
        let mut builder = IndexBuilder::new("/catalog");
        let err = builder
            .add_graph("a/v1/types.json", "v1", &resource_graph(""))
            .unwrap_err();
        assert!(matches!(
            err,
            BuilderError::MissingResourceName { index: 1, .. }
        ));
    }

    #[test]
    fn test_chunk_at_root_has_no_api_version() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(dir.path(), CHUNK_FILE_NAME, "[]");

        let err = build_index(dir.path()).unwrap_err();
        assert!(matches!(err, BuilderError::MissingChunkPath { .. }));
    }

    #[test]
    fn test_corrupt_chunk_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(dir.path(), "a/v1/types.json", r#"[{"99":{}}]"#);

        let err = build_index(dir.path()).unwrap_err();
        assert!(matches!(err, BuilderError::Format { .. }));
    }

    #[test]
    fn test_discover_chunks_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_chunk(dir.path(), "b/v1/types.json", "[]");
        write_chunk(dir.path(), "a/v2/types.json", "[]");
        write_chunk(dir.path(), "a/v1/types.json", "[]");
        write_chunk(dir.path(), "a/v1/other.json", "[]");
        write_chunk(dir.path(), "index.json", "{}");

        let builder = IndexBuilder::new(dir.path());
        let found: Vec<_> = builder
            .discover_chunks()
            .unwrap()
            .iter()
            .map(|path| normalize_relative_path(dir.path(), path).unwrap())
            .collect();

        assert_eq!(
            found,
            ["a/v1/types.json", "a/v2/types.json", "b/v1/types.json"]
        );
    }

    #[test]
    fn test_write_index_creates_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = TypeFactory::new();
        let string = factory.builtin(BuiltInTypeKind::String);
        factory.create(TypeBase::Resource(ResourceType::new("Foo.Bar/baz", string)));
        let graph = factory.finish().unwrap();
        write_chunk(
            dir.path(),
            "Foo.Bar/2021-01-01/types.json",
            &serialized::serialize_all(&graph).unwrap(),
        );

        let report = write_index(dir.path()).unwrap();
        assert_eq!(report.index.len(), 1);

        let saved = TypeIndex::load(&dir.path().join(INDEX_FILE_NAME)).unwrap();
        assert_eq!(
            saved.find("foo.bar/baz", "2021-01-01"),
            Some(&TypeLocation::new("foo.bar/2021-01-01/types.json", 1))
        );
    }
}
