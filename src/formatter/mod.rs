//! Cell formatting for exported field values
//!
//! [`ValueFormatter`] turns any [`Value`] into a single text cell that can be
//! placed between column delimiters without breaking the row:
//!
//! - timestamps become epoch milliseconds
//! - record references are formatted through the referenced record's fields
//! - integers use their decimal form
//! - strings have the delimiter and newlines replaced by sentinel glyphs
//! - objects are unwrapped through [`UNWRAP_RULES`], or rendered as
//!   `{key = value, ...}` when no rule applies
//! - lists are flattened and joined with ` / `
//! - anything else becomes its quoted debug representation
//!
//! Formatting is total: it never fails and has no side effects.

use std::collections::BTreeMap;

use crate::model::Value;

mod unwrap;

pub use unwrap::{UNWRAP_RULES, UnwrapRule, first_unwrap};

/// Default column delimiter
pub const DEFAULT_DELIMITER: &str = ";";

/// Glyph substituted for the column delimiter inside text values
pub const DELIMITER_SENTINEL: char = '\u{FFFD}';

/// Glyph substituted for newlines inside text values
pub const NEWLINE_SENTINEL: char = '\u{2424}';

/// Separator between flattened list elements
pub const LIST_SEPARATOR: &str = " / ";

/// Separator between `key = value` pairs of a generic object
pub const ENTRY_SEPARATOR: &str = ", ";

/// Separator between key and value of a generic object entry
pub const KEY_VALUE_SEPARATOR: &str = " = ";

/// Formats field values into delimiter-safe cells
#[derive(Debug, Clone)]
pub struct ValueFormatter {
    delimiter: String,
}

impl ValueFormatter {
    /// Create a formatter that protects cells against `delimiter`
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// The delimiter this formatter protects against
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Format a value into one cell
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Time(dt) => {
                // Truncating division, so pre-epoch instants round toward zero
                let millis = dt
                    .timestamp_nanos_opt()
                    .map(|nanos| nanos / 1_000_000)
                    .unwrap_or_else(|| dt.timestamp_millis());
                millis.to_string()
            }
            Value::Record(record) => self.format(&record.aggregate_value()),
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::OptInt(n) => n.map(|n| n.to_string()).unwrap_or_default(),
            Value::Str(s) => self.sanitize(s),
            Value::OptStr(s) => s.as_deref().map(|s| self.sanitize(s)).unwrap_or_default(),
            Value::Map(map) => self.format_map(map),
            Value::List(items) => items
                .iter()
                .map(|item| self.format(item))
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            Value::Other(opaque) => format!("\"{}\"", self.sanitize(&opaque.repr)),
        }
    }

    /// Format an optional value; a missing value is an empty cell
    pub fn format_optional(&self, value: Option<&Value>) -> String {
        value.map(|v| self.format(v)).unwrap_or_default()
    }

    /// Replace the delimiter and newlines with their sentinel glyphs
    pub fn sanitize(&self, s: &str) -> String {
        let replaced = if self.delimiter.is_empty() {
            s.to_string()
        } else {
            s.replace(self.delimiter.as_str(), &DELIMITER_SENTINEL.to_string())
        };
        replaced.replace('\n', &NEWLINE_SENTINEL.to_string())
    }

    fn format_map(&self, map: &BTreeMap<String, Value>) -> String {
        if let Some((_, inner)) = first_unwrap(map) {
            return self.format(inner);
        }

        let entries: Vec<String> = map
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}{}{}",
                    self.sanitize(&normalize_key(key)),
                    KEY_VALUE_SEPARATOR,
                    self.format(value)
                )
            })
            .collect();

        format!("{{{}}}", entries.join(ENTRY_SEPARATOR))
    }
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// Rewrite `-` and spaces in object keys to `_`
fn normalize_key(key: &str) -> String {
    key.replace(['-', ' '], "_")
}

/// Format a value with the default delimiter
pub fn format_value(value: &Value) -> String {
    ValueFormatter::default().format(value)
}
