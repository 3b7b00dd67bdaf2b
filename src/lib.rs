//! # bicep-types
//!
//! A library for storing and querying catalogs of cloud resource type
//! definitions.
//!
//! Provider schemas describe resources as graphs of types: objects, arrays,
//! unions, discriminated unions, literals and primitives, frequently with
//! self-referential and mutually recursive definitions. `bicep-types` keeps
//! those graphs in a compact flat form and retrieves single resource types
//! out of catalogs spanning many files without decoding the whole catalog.
//!
//! ## Features
//!
//! - **Handle-based type model**: references are handles into one owned node
//!   sequence, so cycles need no special treatment
//! - **Flat codec**: every reference becomes an integer index; encoding and
//!   decoding are exact inverses, byte for byte
//! - **Catalog index**: one `name@apiVersion` table across every chunk
//! - **Lazy loading**: a chunk is decoded the first time a type inside it is
//!   requested, once, and then cached
//!
//! ## Example
//!
//! ```rust,no_run
//! use bicep_types::core::{BuiltInTypeKind, ObjectType, PropertyFlags, ResourceType, TypeBase, TypeFactory};
//! use bicep_types::catalog::{builder::write_index, writer::write_chunk};
//! use bicep_types::TypeLoader;
//! use std::path::Path;
//!
//! // Producer side: build a graph and persist it
//! let mut factory = TypeFactory::new();
//! let string = factory.builtin(BuiltInTypeKind::String);
//! let body = factory.create(TypeBase::Object(
//!     ObjectType::new("AccountProperties").with_property("name", string, PropertyFlags::REQUIRED),
//! ));
//! let root = factory.create(TypeBase::Resource(ResourceType::new("Microsoft.Storage/storageAccounts", body)));
//! let graph = factory.finish().unwrap();
//!
//! let out = Path::new("generated");
//! write_chunk(out, "Microsoft.Storage", "2021-01-01", &graph, &[root]).unwrap();
//! write_index(out).unwrap();
//!
//! // Consumer side: resolve one type
//! let loader = TypeLoader::from_dir(out);
//! let resolved = loader.resolve("microsoft.storage/storageaccounts", "2021-01-01").unwrap();
//! assert!(resolved.is_some());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Type nodes, handles, factory and graph
//! - [`serialized`]: Flat wire records and the codec
//! - [`catalog`]: Chunk writer, index builder and lazy loader
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod core;
pub mod serialized;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::builder::{build_index, write_index, IndexReport};
pub use catalog::index::{TypeIndex, TypeLocation};
pub use catalog::loader::{LoadError, ResolvedResource, TypeLoader};
pub use catalog::source::{ChunkSource, DirectorySource, MemorySource};
pub use core::reference::{TypeFactory, TypeGraph, TypeRef};
pub use core::types::*;
pub use serialized::{EncodeError, FormatError};
