//! Tagged value trees.
//!
//! An [`ObjectTree`] is the inspectable form of a decoded object: an ordered
//! mapping from field name to [`Value`], always carrying the schema name
//! under `type` and the resolved version under `version`. Downstream tools
//! consume these trees, and [`Registry::decode_from_value`](crate::Registry::decode_from_value)
//! turns them back into live objects.

use chrono::NaiveDateTime;
use persist_common::Clsid;

use crate::{Error, Result};

/// Field holding the schema name.
pub const TYPE_FIELD: &str = "type";

/// Field holding the resolved version.
pub const VERSION_FIELD: &str = "version";

/// Field holding the hex stream offset the object was read from.
pub const OFFSET_FIELD: &str = "stream_offset";

/// A single value in an object tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(NaiveDateTime),
    List(Vec<Value>),
    Object(ObjectTree),
}

impl Value {
    /// Check if this value is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get this value as an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get this value as a signed integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to get this value as a float. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::UInt(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a nested object tree.
    pub fn as_object(&self) -> Option<&ObjectTree> {
        match self {
            Value::Object(tree) => Some(tree),
            _ => None,
        }
    }

    /// Try to get this value as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(<$target>::from(v))
            }
        })*
    };
}

value_from!(UInt as u64: u8, u16, u32, u64);
value_from!(Int as i64: i8, i16, i32, i64);
value_from!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<Clsid> for Value {
    fn from(v: Clsid) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<ObjectTree> for Value {
    fn from(v: ObjectTree) -> Self {
        Value::Object(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) => write!(f, "List[{}]", items.len()),
            Value::Object(tree) => write!(f, "{}", tree.schema_name().unwrap_or("Object")),
        }
    }
}

/// Insertion-ordered mapping from field name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectTree {
    fields: Vec<(String, Value)>,
}

impl ObjectTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a field, replacing any existing field with the same name in place.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.into_iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the tree has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The schema name stored under [`TYPE_FIELD`].
    pub fn schema_name(&self) -> Option<&str> {
        self.get(TYPE_FIELD).and_then(Value::as_str)
    }

    /// The version stored under [`VERSION_FIELD`].
    pub fn version(&self) -> Option<u16> {
        self.get(VERSION_FIELD)
            .and_then(Value::as_u64)
            .and_then(|v| u16::try_from(v).ok())
    }

    /// Get a string field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Get an unsigned integer field.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    /// Get a float field.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Get a boolean field.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Get a nested object field.
    pub fn get_object(&self, name: &str) -> Option<&ObjectTree> {
        self.get(name).and_then(Value::as_object)
    }

    /// Get a required string field.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name)
            .ok_or_else(|| Error::invalid_field(name, "expected a string"))
    }

    /// Get a required unsigned integer field that fits in `T`.
    pub fn require_uint<T: TryFrom<u64>>(&self, name: &str) -> Result<T> {
        self.get_u64(name)
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| Error::invalid_field(name, "expected an unsigned integer in range"))
    }

    /// Get a required float field.
    pub fn require_f64(&self, name: &str) -> Result<f64> {
        self.get_f64(name)
            .ok_or_else(|| Error::invalid_field(name, "expected a number"))
    }

    /// Get a required boolean field.
    pub fn require_bool(&self, name: &str) -> Result<bool> {
        self.get_bool(name)
            .ok_or_else(|| Error::invalid_field(name, "expected a boolean"))
    }

    /// Get a required CLSID field in canonical form.
    pub fn require_clsid(&self, name: &str) -> Result<Clsid> {
        self.require_str(name)?
            .parse()
            .map_err(|e: persist_common::Error| Error::invalid_field(name, e.to_string()))
    }

    /// Render the tree as pretty-printed JSON.
    #[cfg(feature = "json")]
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

type Field = (String, Value);

fn split_field(field: &Field) -> (&str, &Value) {
    (field.0.as_str(), &field.1)
}

impl<'t> IntoIterator for &'t ObjectTree {
    type Item = (&'t str, &'t Value);
    type IntoIter = std::iter::Map<std::slice::Iter<'t, Field>, fn(&'t Field) -> (&'t str, &'t Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter().map(split_field as fn(&'t Field) -> (&'t str, &'t Value))
    }
}

#[cfg(feature = "json")]
impl serde::Serialize for ObjectTree {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
