//! Chunk writer: persists one provider namespace + api version unit.
//!
//! This is the hand-off point for producers. A producer builds its graph with
//! a [`TypeFactory`](crate::core::TypeFactory), then passes the resource roots
//! here. Only nodes reachable from the roots are written, which guarantees
//! every reference in the chunk resolves inside the same chunk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::catalog::builder::CHUNK_FILE_NAME;
use crate::core::reference::{TypeGraph, TypeRef};
use crate::serialized::{self, EncodeError};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Root {0} is not a resource type")]
    NotAResource(TypeRef),

    #[error("Invalid path segment `{0}`")]
    InvalidSegment(String),
}

/// Path of the chunk for `namespace` at `api_version` below `out_dir`
///
/// # Errors
///
/// Returns `WriterError::InvalidSegment` if either segment is empty or
/// contains a path separator.
pub fn chunk_path(out_dir: &Path, namespace: &str, api_version: &str) -> Result<PathBuf, WriterError> {
    for segment in [namespace, api_version] {
        if segment.is_empty()
            || segment == "."
            || segment == ".."
            || segment.contains(['/', '\\'])
        {
            return Err(WriterError::InvalidSegment(segment.to_string()));
        }
    }
    Ok(out_dir.join(namespace).join(api_version).join(CHUNK_FILE_NAME))
}

/// Encode the nodes reachable from `roots` as one chunk.
///
/// Roots come first, in the order given, so the first resource always sits
/// at index 0.
///
/// # Errors
///
/// Returns `WriterError::NotAResource` if a root is missing or not a
/// resource node.
pub fn encode_chunk(graph: &TypeGraph, roots: &[TypeRef]) -> Result<String, WriterError> {
    if let Some(&root) = roots
        .iter()
        .find(|&&root| graph.get(root).and_then(|node| node.as_resource()).is_none())
    {
        return Err(WriterError::NotAResource(root));
    }

    let order = graph.reachable(roots);
    Ok(serialized::serialize(graph, &order)?)
}

/// Write the chunk for `namespace`/`api_version` below `out_dir`, creating
/// directories as needed. Returns the path written.
///
/// # Errors
///
/// See [`chunk_path`] and [`encode_chunk`]; also fails on I/O errors.
pub fn write_chunk(
    out_dir: &Path,
    namespace: &str,
    api_version: &str,
    graph: &TypeGraph,
    roots: &[TypeRef],
) -> Result<PathBuf, WriterError> {
    let path = chunk_path(out_dir, namespace, api_version)?;
    let content = encode_chunk(graph, roots)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;

    debug!(path = %path.display(), roots = roots.len(), "Wrote chunk");
    Ok(path)
}
