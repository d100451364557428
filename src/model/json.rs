//! JSON wire decoding for records
//!
//! The remote item API delivers records as JSON objects:
//!
//! ```json
//! {"created_on": "2024-03-01 10:15:00",
//!  "fields": [{"external_id": "title", "values": [{"value": "Hello"}]}]}
//! ```
//!
//! Field values are arbitrary JSON and are mapped onto [`Value`] without
//! ever failing; only a malformed envelope is rejected.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use super::{Field, Opaque, Record, Value};
use crate::error::SourceError;

/// Timestamp layout used by the item API besides RFC 3339
const PLAIN_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decode one record envelope
///
/// # Arguments
/// * `json` - Parsed JSON object
/// * `line` - Position of the record in its input, for error reporting
pub fn decode_record(json: &JsonValue, line: usize) -> Result<Record, SourceError> {
    let invalid = |reason: String| SourceError::InvalidRecord { line, reason };

    let obj = json
        .as_object()
        .ok_or_else(|| invalid("record is not a JSON object".to_string()))?;

    let created_on = match obj.get("created_on") {
        Some(JsonValue::String(s)) => parse_timestamp(s)
            .ok_or_else(|| invalid(format!("unparseable created_on '{s}'")))?,
        Some(other) => return Err(invalid(format!("created_on is not a string: {other}"))),
        None => return Err(invalid("missing created_on".to_string())),
    };

    let fields = match obj.get("fields") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                decode_field(item)
                    .ok_or_else(|| invalid(format!("field #{i} has no external_id")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(JsonValue::Null) | None => Vec::new(),
        Some(other) => return Err(invalid(format!("fields is not an array: {other}"))),
    };

    Ok(Record { created_on, fields })
}

/// Convert arbitrary JSON into a field value
pub fn value_from_json(json: &JsonValue) -> Value {
    match json {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Other(Opaque::new("float", n.to_string()))
            }
        }
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(value_from_json).collect()),
        JsonValue::Object(obj) => {
            if obj.contains_key("item_id") && obj.contains_key("fields") {
                if let Some(record) = decode_embedded(json) {
                    return Value::Record(Box::new(record));
                }
            }
            let map: BTreeMap<String, Value> = obj
                .iter()
                .map(|(k, v)| (k.clone(), value_from_json(v)))
                .collect();
            Value::Map(map)
        }
        JsonValue::Bool(b) => Value::Other(Opaque::new("bool", b.to_string())),
        JsonValue::Null => Value::Other(Opaque::new("null", "null")),
    }
}

/// Parse an RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) timestamp
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, PLAIN_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn decode_field(json: &JsonValue) -> Option<Field> {
    let name = json.get("external_id")?.as_str()?.to_string();
    let value = json
        .get("values")
        .map(value_from_json)
        .unwrap_or_else(|| Value::List(Vec::new()));
    Some(Field { name, value })
}

/// Records linked from a field may omit their own timestamp
fn decode_embedded(json: &JsonValue) -> Option<Record> {
    let created_on = json
        .get("created_on")
        .and_then(JsonValue::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let fields = json
        .get("fields")?
        .as_array()?
        .iter()
        .filter_map(decode_field)
        .collect();
    Some(Record { created_on, fields })
}
