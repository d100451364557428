//! Record data model
//!
//! A [`Record`] is one exported entity: a creation timestamp plus a list of
//! named [`Field`]s. Field content is a [`Value`], a recursive sum type that
//! covers every shape the remote source produces (scalars, timestamps,
//! references to other records, objects, lists) with an explicit
//! [`Value::Other`] arm for anything unrecognized.
//!
//! All model types are immutable once built and are moved, never shared,
//! between the producer and consumer tasks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

pub mod json;

pub use json::{decode_record, value_from_json};

/// One exported entity
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Creation timestamp
    pub created_on: DateTime<Utc>,
    /// Named fields, in the order the source delivered them
    pub fields: Vec<Field>,
}

/// A named value attached to a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Stable external identifier, used as the column key
    pub name: String,
    /// Field content
    pub value: Value,
}

/// Dynamically-shaped field content
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Optional integer; `None` renders as an empty cell
    OptInt(Option<i64>),
    /// Text
    Str(String),
    /// Optional text; `None` renders as an empty cell
    OptStr(Option<String>),
    /// Point in time with nanosecond precision
    Time(DateTime<Utc>),
    /// Link to another record
    Record(Box<Record>),
    /// Object-shaped data keyed by string
    Map(BTreeMap<String, Value>),
    /// Ordered list
    List(Vec<Value>),
    /// Any shape the formatter has no rule for
    Other(Opaque),
}

/// Payload of an unrecognized value
///
/// Carries a type tag and a debug representation that the formatter falls
/// back to.
#[derive(Debug, Clone, PartialEq)]
pub struct Opaque {
    /// Short name of the source type (`bool`, `float`, `null`, ...)
    pub kind: String,
    /// Debug representation of the payload
    pub repr: String,
}

impl Record {
    /// Create a record with no fields
    pub fn new(created_on: DateTime<Utc>) -> Self {
        Self {
            created_on,
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
        self
    }

    /// Look up a field by name
    ///
    /// Returns the first match if the record carries duplicate names.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The record seen as a single value: a map of field name to value
    ///
    /// Used when this record is referenced from another record's field.
    /// Duplicate names keep the first occurrence.
    pub fn aggregate_value(&self) -> Value {
        let mut map = BTreeMap::new();
        for field in &self.fields {
            map.entry(field.name.clone())
                .or_insert_with(|| field.value.clone());
        }
        Value::Map(map)
    }
}

impl Opaque {
    pub fn new(kind: impl Into<String>, repr: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            repr: repr.into(),
        }
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.repr)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::Time(dt)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(Box::new(record))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Value {
    fn from(entries: [(&str, Value); N]) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}
