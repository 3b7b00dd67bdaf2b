//! Where the loader reads the index and chunks from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::catalog::index::INDEX_FILE_NAME;
use crate::catalog::loader::LoadError;
use crate::utils::validation::validate_relative_path;

/// Byte source for a built catalog.
///
/// Implementations must be shareable across threads; the loader calls them
/// at most once for the index and at most once per chunk.
pub trait ChunkSource: Send + Sync {
    /// Raw bytes of the index artifact
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read.
    fn read_index(&self) -> Result<Vec<u8>, LoadError>;

    /// Raw bytes of the chunk at a (lower-cased, forward-slash) relative path
    ///
    /// # Errors
    ///
    /// Returns `LoadError::MissingChunk` if there is no such chunk, or another
    /// error if it cannot be read.
    fn read_chunk(&self, relative_path: &str) -> Result<Vec<u8>, LoadError>;
}

/// A catalog laid out on disk: `index.json` plus chunk files below one directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    base_dir: PathBuf,
}

impl DirectorySource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Index paths are lower-cased, but the files on disk keep their original
    /// case. Try the path verbatim, then match each segment ignoring case.
    fn locate(&self, relative_path: &str) -> Option<PathBuf> {
        let direct = self.base_dir.join(relative_path);
        if direct.is_file() {
            return Some(direct);
        }

        let mut current = self.base_dir.clone();
        for segment in relative_path.split('/') {
            let entry = std::fs::read_dir(&current)
                .ok()?
                .filter_map(Result::ok)
                .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == segment)?;
            current = entry.path();
        }

        current.is_file().then_some(current)
    }
}

impl ChunkSource for DirectorySource {
    fn read_index(&self) -> Result<Vec<u8>, LoadError> {
        let path = self.base_dir.join(INDEX_FILE_NAME);
        std::fs::read(&path).map_err(|source| LoadError::Io { path, source })
    }

    fn read_chunk(&self, relative_path: &str) -> Result<Vec<u8>, LoadError> {
        let relative_path = validate_relative_path(relative_path)?;
        let path = self
            .locate(relative_path)
            .ok_or_else(|| LoadError::MissingChunk(relative_path.to_string()))?;
        std::fs::read(&path).map_err(|source| LoadError::Io { path, source })
    }
}

/// An in-memory catalog, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    index: Vec<u8>,
    chunks: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new(index: impl Into<Vec<u8>>) -> Self {
        Self {
            index: index.into(),
            chunks: HashMap::new(),
        }
    }

    /// Add a chunk; the path is lower-cased to match index entries
    #[must_use]
    pub fn with_chunk(mut self, relative_path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.chunks
            .insert(relative_path.to_lowercase(), content.into());
        self
    }
}

impl ChunkSource for MemorySource {
    fn read_index(&self) -> Result<Vec<u8>, LoadError> {
        Ok(self.index.clone())
    }

    fn read_chunk(&self, relative_path: &str) -> Result<Vec<u8>, LoadError> {
        self.chunks
            .get(relative_path)
            .cloned()
            .ok_or_else(|| LoadError::MissingChunk(relative_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_source_matches_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let chunk_dir = dir.path().join("Foo.Bar").join("2021-01-01-Preview");
        std::fs::create_dir_all(&chunk_dir).unwrap();
        std::fs::write(chunk_dir.join("types.json"), "[]").unwrap();

        let source = DirectorySource::new(dir.path());
        let bytes = source
            .read_chunk("foo.bar/2021-01-01-preview/types.json")
            .unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[test]
    fn test_directory_source_missing_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        let err = source.read_chunk("nope/v1/types.json").unwrap_err();
        assert!(matches!(err, LoadError::MissingChunk(path) if path == "nope/v1/types.json"));
    }

    #[test]
    fn test_directory_source_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        let err = source.read_chunk("../outside/types.json").unwrap_err();
        assert!(matches!(err, LoadError::InvalidPath(_)));
    }

    #[test]
    fn test_directory_source_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(source.read_index(), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new("{}").with_chunk("A/v1/types.json", "[]");
        assert_eq!(source.read_index().unwrap(), b"{}");
        assert_eq!(source.read_chunk("a/v1/types.json").unwrap(), b"[]");
        assert!(source.read_chunk("b/v1/types.json").is_err());
    }
}
