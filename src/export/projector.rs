//! Projection of one record onto the fixed column set

use chrono::SecondsFormat;

use super::schema::Schema;
use crate::formatter::ValueFormatter;
use crate::model::Record;

/// Leading columns every row carries ahead of the schema columns
pub const PREAMBLE_COLUMNS: [&str; 3] = ["time", "unixtime", ""];

/// Marker prefixed to the header line
pub const HEADER_MARKER: &str = "#";

/// Turns records into ordered cell vectors
#[derive(Debug, Clone, Default)]
pub struct RowProjector {
    formatter: ValueFormatter,
}

impl RowProjector {
    pub fn new(formatter: ValueFormatter) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &ValueFormatter {
        &self.formatter
    }

    /// Project `record` onto `schema`
    ///
    /// The result always holds `3 + schema.len()` cells: the RFC 3339
    /// creation time, the epoch seconds, an empty reserved cell, then one
    /// cell per schema column. Fields missing from the record give empty
    /// cells; fields absent from the schema are dropped.
    pub fn project(&self, record: &Record, schema: &Schema) -> Vec<String> {
        let mut cells = Vec::with_capacity(PREAMBLE_COLUMNS.len() + schema.len());
        cells.push(
            record
                .created_on
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        );
        cells.push(record.created_on.timestamp().to_string());
        cells.push(String::new());

        for name in schema.columns() {
            let value = record.field(name).map(|field| &field.value);
            cells.push(self.formatter.format_optional(value));
        }

        cells
    }

    /// Header cells: the marked preamble followed by the schema columns
    ///
    /// Column names go through the same delimiter protection as text values.
    pub fn header(&self, schema: &Schema) -> Vec<String> {
        let mut cells: Vec<String> = PREAMBLE_COLUMNS.iter().map(|c| c.to_string()).collect();
        cells[0] = format!("{HEADER_MARKER}{}", cells[0]);
        cells.extend(schema.columns().iter().map(|c| self.formatter.sanitize(c)));
        cells
    }
}
