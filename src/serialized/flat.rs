//! Wire records for chunk files.
//!
//! A chunk is a JSON array of records. Each record is an object with exactly
//! one key, the decimal kind tag, whose value holds the kind-specific fields.
//! References are plain integers naming a position in the same array.
//!
//! ```text
//! [{"6":{}},{"11":{"name":"names","itemType":0}},{"12":{"name":"Foo.Bar/baz","body":3}}, ...]
//! ```

use std::fmt;
use std::marker::PhantomData;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::types::BuiltInTypeKind;

/// Closed kind tag enumeration. Append-only: removed values are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlatTypeKind {
    Never = 1,
    Any = 2,
    Null = 3,
    Bool = 4,
    Int = 5,
    String = 6,
    Object = 7,
    Array = 8,
    ResourceRef = 9,
    TypedObject = 10,
    TypedArray = 11,
    Resource = 12,
    Union = 13,
    StringLiteral = 14,
    DiscriminatedObject = 15,
}

impl FlatTypeKind {
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_builtin(kind: BuiltInTypeKind) -> Self {
        match kind {
            BuiltInTypeKind::Never => Self::Never,
            BuiltInTypeKind::Any => Self::Any,
            BuiltInTypeKind::Null => Self::Null,
            BuiltInTypeKind::Bool => Self::Bool,
            BuiltInTypeKind::Int => Self::Int,
            BuiltInTypeKind::String => Self::String,
            BuiltInTypeKind::Object => Self::Object,
            BuiltInTypeKind::Array => Self::Array,
            BuiltInTypeKind::ResourceRef => Self::ResourceRef,
        }
    }

    /// The built-in kind for tags 1 through 9
    #[must_use]
    pub fn as_builtin(self) -> Option<BuiltInTypeKind> {
        match self {
            Self::Never => Some(BuiltInTypeKind::Never),
            Self::Any => Some(BuiltInTypeKind::Any),
            Self::Null => Some(BuiltInTypeKind::Null),
            Self::Bool => Some(BuiltInTypeKind::Bool),
            Self::Int => Some(BuiltInTypeKind::Int),
            Self::String => Some(BuiltInTypeKind::String),
            Self::Object => Some(BuiltInTypeKind::Object),
            Self::Array => Some(BuiltInTypeKind::Array),
            Self::ResourceRef => Some(BuiltInTypeKind::ResourceRef),
            Self::TypedObject
            | Self::TypedArray
            | Self::Resource
            | Self::Union
            | Self::StringLiteral
            | Self::DiscriminatedObject => None,
        }
    }
}

impl TryFrom<u8> for FlatTypeKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => Self::Never,
            2 => Self::Any,
            3 => Self::Null,
            4 => Self::Bool,
            5 => Self::Int,
            6 => Self::String,
            7 => Self::Object,
            8 => Self::Array,
            9 => Self::ResourceRef,
            10 => Self::TypedObject,
            11 => Self::TypedArray,
            12 => Self::Resource,
            13 => Self::Union,
            14 => Self::StringLiteral,
            15 => Self::DiscriminatedObject,
            other => return Err(other),
        })
    }
}

/// Property entry: `{"type": <index>, "flags": <bits>}`, flags omitted when zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatProperty {
    #[serde(rename = "type")]
    pub type_index: usize,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub flags: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde passes by reference
fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Body of a built-in record, always `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEmpty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(deserialize_with = "unique_keys")]
    pub properties: IndexMap<String, FlatProperty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatArray {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub item_type: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatResource {
    pub name: String,
    pub body: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatUnion {
    pub elements: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatStringLiteral {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatDiscriminatedObject {
    pub name: String,
    pub discriminator: String,
    #[serde(deserialize_with = "unique_keys")]
    pub base_properties: IndexMap<String, FlatProperty>,
    #[serde(deserialize_with = "unique_keys")]
    pub elements: IndexMap<String, usize>,
}

/// Named entries of a record. JSON allows repeated keys; a chunk does not.
fn unique_keys<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = IndexMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                match entries.entry(key) {
                    Entry::Occupied(entry) => {
                        return Err(de::Error::custom(format!(
                            "duplicate key `{}`",
                            entry.key()
                        )));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(value);
                    }
                }
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

/// One index-addressed wire record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatRecord {
    BuiltIn(BuiltInTypeKind),
    TypedObject(FlatObject),
    TypedArray(FlatArray),
    Resource(FlatResource),
    Union(FlatUnion),
    StringLiteral(FlatStringLiteral),
    DiscriminatedObject(FlatDiscriminatedObject),
}

impl FlatRecord {
    #[must_use]
    pub fn kind(&self) -> FlatTypeKind {
        match self {
            Self::BuiltIn(kind) => FlatTypeKind::from_builtin(*kind),
            Self::TypedObject(_) => FlatTypeKind::TypedObject,
            Self::TypedArray(_) => FlatTypeKind::TypedArray,
            Self::Resource(_) => FlatTypeKind::Resource,
            Self::Union(_) => FlatTypeKind::Union,
            Self::StringLiteral(_) => FlatTypeKind::StringLiteral,
            Self::DiscriminatedObject(_) => FlatTypeKind::DiscriminatedObject,
        }
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tag = self.kind().tag().to_string();
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::BuiltIn(_) => map.serialize_entry(&tag, &FlatEmpty {})?,
            Self::TypedObject(body) => map.serialize_entry(&tag, body)?,
            Self::TypedArray(body) => map.serialize_entry(&tag, body)?,
            Self::Resource(body) => map.serialize_entry(&tag, body)?,
            Self::Union(body) => map.serialize_entry(&tag, body)?,
            Self::StringLiteral(body) => map.serialize_entry(&tag, body)?,
            Self::DiscriminatedObject(body) => map.serialize_entry(&tag, body)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FlatRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = FlatRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object with a single kind tag key")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FlatRecord, A::Error> {
        let tag: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("record has no kind tag"))?;
        let kind = tag
            .parse::<u8>()
            .ok()
            .and_then(|value| FlatTypeKind::try_from(value).ok())
            .ok_or_else(|| de::Error::custom(format!("unknown kind tag `{tag}`")))?;

        let record = match kind {
            FlatTypeKind::TypedObject => FlatRecord::TypedObject(map.next_value()?),
            FlatTypeKind::TypedArray => FlatRecord::TypedArray(map.next_value()?),
            FlatTypeKind::Resource => FlatRecord::Resource(map.next_value()?),
            FlatTypeKind::Union => FlatRecord::Union(map.next_value()?),
            FlatTypeKind::StringLiteral => FlatRecord::StringLiteral(map.next_value()?),
            FlatTypeKind::DiscriminatedObject => {
                FlatRecord::DiscriminatedObject(map.next_value()?)
            }
            builtin => {
                map.next_value::<FlatEmpty>()?;
                let kind = builtin
                    .as_builtin()
                    .ok_or_else(|| de::Error::custom(format!("unknown kind tag `{tag}`")))?;
                FlatRecord::BuiltIn(kind)
            }
        };

        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(de::Error::custom("record has more than one kind tag"));
        }

        Ok(record)
    }
}
