use bitflags::bitflags;
use indexmap::IndexMap;

use crate::core::reference::TypeRef;

/// Primitive kinds that need no further description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltInTypeKind {
    Never,
    Any,
    Null,
    Bool,
    Int,
    String,
    Object,
    Array,
    ResourceRef,
}

impl BuiltInTypeKind {
    pub const ALL: [Self; 9] = [
        Self::Never,
        Self::Any,
        Self::Null,
        Self::Bool,
        Self::Int,
        Self::String,
        Self::Object,
        Self::Array,
        Self::ResourceRef,
    ];
}

impl std::fmt::Display for BuiltInTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Any => write!(f, "any"),
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::ResourceRef => write!(f, "resourceRef"),
        }
    }
}

bitflags! {
    /// Behavioural flags attached to an object property
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        const REQUIRED = 1 << 0;
        const READ_ONLY = 1 << 1;
        const WRITE_ONLY = 1 << 2;
        const DEPLOY_TIME_CONSTANT = 1 << 3;
    }
}

/// A named member of an object or discriminated object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectProperty {
    pub type_ref: TypeRef,
    pub flags: PropertyFlags,
}

impl ObjectProperty {
    #[must_use]
    pub fn new(type_ref: TypeRef, flags: PropertyFlags) -> Self {
        Self { type_ref, flags }
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.flags.contains(PropertyFlags::REQUIRED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInType {
    pub kind: BuiltInTypeKind,
}

/// A singleton literal (enum member, discriminator tag, constant name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteralType {
    pub value: String,
}

/// An object shape.
///
/// `properties` and `additional_properties` are independent: a dictionary type
/// has only `additional_properties`, a record type only `properties`, and a
/// producer may supply both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub name: Option<String>,
    pub properties: IndexMap<String, ObjectProperty>,
    pub additional_properties: Option<TypeRef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A nameless object whose values are all of `value_type`
    #[must_use]
    pub fn dictionary(value_type: TypeRef) -> Self {
        Self {
            additional_properties: Some(value_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        type_ref: TypeRef,
        flags: PropertyFlags,
    ) -> Self {
        self.properties
            .insert(name.into(), ObjectProperty::new(type_ref, flags));
        self
    }

    #[must_use]
    pub fn with_additional_properties(mut self, type_ref: TypeRef) -> Self {
        self.additional_properties = Some(type_ref);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub name: Option<String>,
    pub item_type: TypeRef,
}

impl ArrayType {
    #[must_use]
    pub fn of(item_type: TypeRef) -> Self {
        Self {
            name: None,
            item_type,
        }
    }

    pub fn named(name: impl Into<String>, item_type: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            item_type,
        }
    }
}

/// One-of a non-empty ordered set of alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    pub elements: Vec<TypeRef>,
}

/// A tagged union of object shapes keyed by the value of `discriminator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatedObjectType {
    pub name: String,
    pub discriminator: String,
    pub base_properties: IndexMap<String, ObjectProperty>,
    pub elements: IndexMap<String, TypeRef>,
}

impl DiscriminatedObjectType {
    pub fn new(name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discriminator: discriminator.into(),
            base_properties: IndexMap::new(),
            elements: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_base_property(
        mut self,
        name: impl Into<String>,
        type_ref: TypeRef,
        flags: PropertyFlags,
    ) -> Self {
        self.base_properties
            .insert(name.into(), ObjectProperty::new(type_ref, flags));
        self
    }

    #[must_use]
    pub fn with_element(mut self, value: impl Into<String>, type_ref: TypeRef) -> Self {
        self.elements.insert(value.into(), type_ref);
        self
    }
}

/// A deployable resource root, e.g. `Microsoft.Storage/storageAccounts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub name: String,
    pub body: TypeRef,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, body: TypeRef) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

/// A single node of a type graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBase {
    BuiltIn(BuiltInType),
    StringLiteral(StringLiteralType),
    Object(ObjectType),
    Array(ArrayType),
    Union(UnionType),
    DiscriminatedObject(DiscriminatedObjectType),
    Resource(ResourceType),
}

impl TypeBase {
    #[must_use]
    pub fn builtin(kind: BuiltInTypeKind) -> Self {
        Self::BuiltIn(BuiltInType { kind })
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        Self::StringLiteral(StringLiteralType {
            value: value.into(),
        })
    }

    #[must_use]
    pub fn union(elements: Vec<TypeRef>) -> Self {
        Self::Union(UnionType { elements })
    }

    /// Short description of the variant, used in diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::BuiltIn(_) => "built-in",
            Self::StringLiteral(_) => "string literal",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Union(_) => "union",
            Self::DiscriminatedObject(_) => "discriminated object",
            Self::Resource(_) => "resource",
        }
    }

    /// Name carried by the node, if its variant has one
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Object(object) => object.name.as_deref(),
            Self::Array(array) => array.name.as_deref(),
            Self::DiscriminatedObject(object) => Some(&object.name),
            Self::Resource(resource) => Some(&resource.name),
            Self::BuiltIn(_) | Self::StringLiteral(_) | Self::Union(_) => None,
        }
    }

    #[must_use]
    pub fn as_resource(&self) -> Option<&ResourceType> {
        match self {
            Self::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Immediate outgoing references, in field order. Never follows them.
    #[must_use]
    pub fn references(&self) -> Vec<TypeRef> {
        match self {
            Self::BuiltIn(_) | Self::StringLiteral(_) => Vec::new(),
            Self::Object(object) => object
                .properties
                .values()
                .map(|p| p.type_ref)
                .chain(object.additional_properties)
                .collect(),
            Self::Array(array) => vec![array.item_type],
            Self::Union(union) => union.elements.clone(),
            Self::DiscriminatedObject(object) => object
                .base_properties
                .values()
                .map(|p| p.type_ref)
                .chain(object.elements.values().copied())
                .collect(),
            Self::Resource(resource) => vec![resource.body],
        }
    }
}
