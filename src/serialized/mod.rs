//! Flat, index-addressed serialization of type graphs.
//!
//! In memory, nodes refer to each other through [`TypeRef`](crate::core::TypeRef)
//! handles; on the wire every reference becomes the integer position of its
//! target in the chunk's record array. Encoding only ever looks at a node's
//! immediate fields, and decoding validates indices instead of following
//! them, so neither direction recurses through cycles.
//!
//! ```rust
//! use bicep_types::core::{ArrayType, BuiltInTypeKind, TypeBase, TypeFactory};
//! use bicep_types::serialized;
//!
//! let mut factory = TypeFactory::new();
//! let int = factory.builtin(BuiltInTypeKind::Int);
//! factory.create(TypeBase::Array(ArrayType::named("ints", int)));
//! let graph = factory.finish().unwrap();
//!
//! let json = serialized::serialize_all(&graph).unwrap();
//! assert_eq!(json, r#"[{"5":{}},{"11":{"name":"ints","itemType":0}}]"#);
//! assert_eq!(serialized::deserialize(&json).unwrap(), graph);
//! ```

pub mod codec;
pub mod flat;

pub use codec::{
    decode, deserialize, deserialize_slice, encode, encode_all, serialize, serialize_all,
    EncodeError, FormatError,
};
pub use flat::{FlatRecord, FlatTypeKind};
