//! Core data types for resource type graphs.
//!
//! - [`TypeBase`]: one node of a graph (built-in, literal, object, array,
//!   union, discriminated object or resource)
//! - [`TypeRef`]: a handle to a node; references are never inline copies
//! - [`TypeFactory`]: producer-side allocator supporting deferred definitions
//!   for recursive types
//! - [`TypeGraph`]: the immutable, fully resolved result
//!
//! ## Cycles
//!
//! Self-referential and mutually recursive definitions are common in provider
//! schemas. A node refers to other nodes only through handles into the same
//! owned sequence, so a cycle is just a handle pointing back at an earlier
//! slot and never requires recursive construction.
//!
//! ```rust
//! use bicep_types::core::reference::TypeFactory;
//! use bicep_types::core::types::{ArrayType, TypeBase};
//!
//! let mut factory = TypeFactory::new();
//! let node = factory.reserve();
//! factory.define(node, TypeBase::Array(ArrayType::named("nested", node))).unwrap();
//! let graph = factory.finish().unwrap();
//! assert_eq!(graph.len(), 1);
//! ```

pub mod reference;
pub mod types;

pub use reference::{ModelError, TypeFactory, TypeGraph, TypeRef};
pub use types::*;
