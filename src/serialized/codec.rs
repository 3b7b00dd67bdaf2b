use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::core::reference::{TypeGraph, TypeRef};
use crate::core::types::{
    ArrayType, DiscriminatedObjectType, ObjectProperty, ObjectType, PropertyFlags, ResourceType,
    StringLiteralType, TypeBase, UnionType,
};
use crate::serialized::flat::{
    FlatArray, FlatDiscriminatedObject, FlatObject, FlatProperty, FlatRecord, FlatResource,
    FlatStringLiteral, FlatUnion,
};

/// Malformed chunk content. Fatal to the decode call; nothing partial is returned.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Malformed chunk: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record {index} references index {target}, which is not in the chunk")]
    DanglingReference { index: usize, target: usize },

    #[error("Union at record {index} has no elements")]
    EmptyUnion { index: usize },

    #[error("Property `{property}` of record {index} has unknown flags {bits:#x}")]
    InvalidFlags {
        index: usize,
        property: String,
        bits: u32,
    },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Type {0} is not part of the graph being encoded")]
    UnknownType(TypeRef),

    #[error("Type {from} references {target}, which is not in the encoded sequence")]
    UnmappedReference { from: TypeRef, target: TypeRef },

    #[error("Failed to write chunk: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode the nodes named by `order` into flat records.
///
/// Every distinct handle gets the index of its first occurrence in `order`
/// before any record is produced, so references can be rewritten to indices
/// regardless of cycles. Only each node's immediate fields are visited.
///
/// # Errors
///
/// Returns an error if `order` names a handle outside `graph`, or if a node
/// references a node that is not itself in `order`.
pub fn encode(graph: &TypeGraph, order: &[TypeRef]) -> Result<Vec<FlatRecord>, EncodeError> {
    let mut indices: HashMap<TypeRef, usize> = HashMap::with_capacity(order.len());
    let mut distinct = Vec::with_capacity(order.len());
    for &handle in order {
        if graph.get(handle).is_none() {
            return Err(EncodeError::UnknownType(handle));
        }
        if !indices.contains_key(&handle) {
            indices.insert(handle, distinct.len());
            distinct.push(handle);
        }
    }

    distinct
        .into_iter()
        .map(|handle| encode_node(handle, graph.resolve(handle), &indices))
        .collect()
}

/// Encode every node of `graph` in graph order
pub fn encode_all(graph: &TypeGraph) -> Result<Vec<FlatRecord>, EncodeError> {
    let order: Vec<TypeRef> = graph.handles().collect();
    encode(graph, &order)
}

fn encode_node(
    handle: TypeRef,
    node: &TypeBase,
    indices: &HashMap<TypeRef, usize>,
) -> Result<FlatRecord, EncodeError> {
    let index_of = |target: TypeRef| {
        indices
            .get(&target)
            .copied()
            .ok_or(EncodeError::UnmappedReference {
                from: handle,
                target,
            })
    };
    let encode_properties = |properties: &IndexMap<String, ObjectProperty>| {
        properties
            .iter()
            .map(|(name, property)| {
                Ok((
                    name.clone(),
                    FlatProperty {
                        type_index: index_of(property.type_ref)?,
                        flags: property.flags.bits(),
                    },
                ))
            })
            .collect::<Result<IndexMap<_, _>, EncodeError>>()
    };

    Ok(match node {
        TypeBase::BuiltIn(builtin) => FlatRecord::BuiltIn(builtin.kind),
        TypeBase::StringLiteral(literal) => FlatRecord::StringLiteral(FlatStringLiteral {
            value: literal.value.clone(),
        }),
        TypeBase::Object(object) => FlatRecord::TypedObject(FlatObject {
            name: object.name.clone(),
            properties: encode_properties(&object.properties)?,
            additional_properties: object.additional_properties.map(index_of).transpose()?,
        }),
        TypeBase::Array(array) => FlatRecord::TypedArray(FlatArray {
            name: array.name.clone(),
            item_type: index_of(array.item_type)?,
        }),
        TypeBase::Union(union) => FlatRecord::Union(FlatUnion {
            elements: union
                .elements
                .iter()
                .map(|&element| index_of(element))
                .collect::<Result<_, _>>()?,
        }),
        TypeBase::DiscriminatedObject(object) => {
            FlatRecord::DiscriminatedObject(FlatDiscriminatedObject {
                name: object.name.clone(),
                discriminator: object.discriminator.clone(),
                base_properties: encode_properties(&object.base_properties)?,
                elements: object
                    .elements
                    .iter()
                    .map(|(value, &element)| Ok((value.clone(), index_of(element)?)))
                    .collect::<Result<_, EncodeError>>()?,
            })
        }
        TypeBase::Resource(resource) => FlatRecord::Resource(FlatResource {
            name: resource.name.clone(),
            body: index_of(resource.body)?,
        }),
    })
}

/// Rebuild a graph from flat records. Record position is the node's index.
///
/// Every index is validated up front, so the returned graph resolves any of
/// its references with a plain lookup and cycles need no special handling.
///
/// # Errors
///
/// Returns an error if a record references an index outside the record set,
/// a union is empty, or a property carries unknown flag bits.
pub fn decode(records: Vec<FlatRecord>) -> Result<TypeGraph, FormatError> {
    let count = records.len();
    let types = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| decode_record(index, record, count))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TypeGraph::from_resolved(types))
}

fn decode_record(index: usize, record: FlatRecord, count: usize) -> Result<TypeBase, FormatError> {
    let reference = |target: usize| {
        if target < count {
            Ok(TypeRef::from_index(target))
        } else {
            Err(FormatError::DanglingReference { index, target })
        }
    };
    let decode_properties = |properties: IndexMap<String, FlatProperty>| {
        properties
            .into_iter()
            .map(|(name, property)| {
                let flags = PropertyFlags::from_bits(property.flags).ok_or_else(|| {
                    FormatError::InvalidFlags {
                        index,
                        property: name.clone(),
                        bits: property.flags,
                    }
                })?;
                let type_ref = reference(property.type_index)?;
                Ok((name, ObjectProperty::new(type_ref, flags)))
            })
            .collect::<Result<IndexMap<_, _>, FormatError>>()
    };

    Ok(match record {
        FlatRecord::BuiltIn(kind) => TypeBase::builtin(kind),
        FlatRecord::StringLiteral(literal) => TypeBase::StringLiteral(StringLiteralType {
            value: literal.value,
        }),
        FlatRecord::TypedObject(object) => TypeBase::Object(ObjectType {
            name: object.name,
            properties: decode_properties(object.properties)?,
            additional_properties: object.additional_properties.map(reference).transpose()?,
        }),
        FlatRecord::TypedArray(array) => TypeBase::Array(ArrayType {
            name: array.name,
            item_type: reference(array.item_type)?,
        }),
        FlatRecord::Union(union) => {
            if union.elements.is_empty() {
                return Err(FormatError::EmptyUnion { index });
            }
            TypeBase::Union(UnionType {
                elements: union
                    .elements
                    .into_iter()
                    .map(reference)
                    .collect::<Result<_, _>>()?,
            })
        }
        FlatRecord::DiscriminatedObject(object) => {
            TypeBase::DiscriminatedObject(DiscriminatedObjectType {
                name: object.name,
                discriminator: object.discriminator,
                base_properties: decode_properties(object.base_properties)?,
                elements: object
                    .elements
                    .into_iter()
                    .map(|(value, element)| Ok((value, reference(element)?)))
                    .collect::<Result<_, FormatError>>()?,
            })
        }
        FlatRecord::Resource(resource) => TypeBase::Resource(ResourceType {
            name: resource.name,
            body: reference(resource.body)?,
        }),
    })
}

/// Encode the nodes named by `order` as compact chunk JSON
///
/// # Errors
///
/// See [`encode`].
pub fn serialize(graph: &TypeGraph, order: &[TypeRef]) -> Result<String, EncodeError> {
    let records = encode(graph, order)?;
    Ok(serde_json::to_string(&records)?)
}

/// Encode a whole graph as compact chunk JSON
///
/// # Errors
///
/// See [`encode`].
pub fn serialize_all(graph: &TypeGraph) -> Result<String, EncodeError> {
    let records = encode_all(graph)?;
    Ok(serde_json::to_string(&records)?)
}

/// Decode chunk JSON text
///
/// # Errors
///
/// Returns a [`FormatError`] for any malformed content.
pub fn deserialize(content: &str) -> Result<TypeGraph, FormatError> {
    let records: Vec<FlatRecord> = serde_json::from_str(content)?;
    decode(records)
}

/// Decode chunk JSON bytes
///
/// # Errors
///
/// Returns a [`FormatError`] for any malformed content.
pub fn deserialize_slice(content: &[u8]) -> Result<TypeGraph, FormatError> {
    let records: Vec<FlatRecord> = serde_json::from_slice(content)?;
    decode(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::TypeFactory;
    use crate::core::types::BuiltInTypeKind;

    #[test]
    fn test_encode_rewrites_references_to_indices() {
        let mut factory = TypeFactory::new();
        let int = factory.builtin(BuiltInTypeKind::Int);
        let array = factory.create(TypeBase::Array(ArrayType::of(int)));
        let graph = factory.finish().unwrap();

        // Reversed order: the array lands at 0 and points forward to 1
        let records = encode(&graph, &[array, int]).unwrap();
        assert_eq!(
            records,
            vec![
                FlatRecord::TypedArray(FlatArray {
                    name: None,
                    item_type: 1
                }),
                FlatRecord::BuiltIn(BuiltInTypeKind::Int),
            ]
        );
    }

    #[test]
    fn test_duplicate_handles_collapse_to_one_slot() {
        let mut factory = TypeFactory::new();
        let int = factory.builtin(BuiltInTypeKind::Int);
        let array = factory.create(TypeBase::Array(ArrayType::of(int)));
        let graph = factory.finish().unwrap();

        let records = encode(&graph, &[int, array, int, array]).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_encode_rejects_reference_outside_order() {
        let mut factory = TypeFactory::new();
        let int = factory.builtin(BuiltInTypeKind::Int);
        let array = factory.create(TypeBase::Array(ArrayType::of(int)));
        let graph = factory.finish().unwrap();

        let err = encode(&graph, &[array]).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnmappedReference { from, target } if from == array && target == int
        ));
    }

    #[test]
    fn test_encode_rejects_unknown_handle() {
        let graph = TypeFactory::new().finish().unwrap();
        let err = encode(&graph, &[TypeRef::from_index(0)]).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownType(_)));
    }

    #[test]
    fn test_self_reference_round_trip() {
        let content = r#"[{"11":{"name":"cyclic","itemType":0}}]"#;
        let graph = deserialize(content).unwrap();
        let node = TypeRef::from_index(0);
        match graph.resolve(node) {
            TypeBase::Array(array) => assert_eq!(array.item_type, node),
            other => panic!("unexpected node: {other:?}"),
        }
        assert_eq!(serialize_all(&graph).unwrap(), content);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let err = deserialize(r#"[{"6":{}},{"11":{"itemType":5}}]"#).unwrap_err();
        assert!(matches!(
            err,
            FormatError::DanglingReference {
                index: 1,
                target: 5
            }
        ));
    }

    #[test]
    fn test_empty_union_rejected() {
        let err = deserialize(r#"[{"13":{"elements":[]}}]"#).unwrap_err();
        assert!(matches!(err, FormatError::EmptyUnion { index: 0 }));
    }

    #[test]
    fn test_unknown_flags_rejected() {
        let err =
            deserialize(r#"[{"6":{}},{"10":{"properties":{"a":{"type":0,"flags":64}}}}]"#)
                .unwrap_err();
        assert!(matches!(err, FormatError::InvalidFlags { index: 1, bits: 64, .. }));
    }

    #[test]
    fn test_unknown_tag_is_format_error() {
        let err = deserialize(r#"[{"6":{}},{"42":{}}]"#).unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
        assert!(err.to_string().contains("unknown kind tag `42`"));
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let err = deserialize(
            r#"[{"6":{}},{"5":{}},{"10":{"properties":{"a":{"type":0},"a":{"type":1}}}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::Json(_)));
        assert!(err.to_string().contains("duplicate key `a`"));
    }

    #[test]
    fn test_duplicate_discriminated_element_rejected() {
        let content = r#"[{"6":{}},{"10":{"properties":{}}},{"15":{"name":"Base","discriminator":"kind","baseProperties":{},"elements":{"A":1,"A":1}}}]"#;
        let err = deserialize(content).unwrap_err();
        assert!(err.to_string().contains("duplicate key `A`"));

        let content = r#"[{"6":{}},{"15":{"name":"Base","discriminator":"kind","baseProperties":{"id":{"type":0},"id":{"type":0,"flags":2}},"elements":{}}}]"#;
        let err = deserialize(content).unwrap_err();
        assert!(err.to_string().contains("duplicate key `id`"));
    }

    #[test]
    fn test_empty_chunk() {
        let graph = deserialize("[]").unwrap();
        assert!(graph.is_empty());
        assert_eq!(serialize_all(&graph).unwrap(), "[]");
    }
}
