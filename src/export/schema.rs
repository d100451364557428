//! Column set inference from a bounded prefix of the record stream
//!
//! The [`SchemaCollector`] pulls records off the channel until it has seen
//! the prefix window (or the stream ends), unioning their field names. The
//! records it consumed are handed back so they can be written as the first
//! rows: the stream is single-pass.

use std::collections::BTreeSet;

use tokio::sync::mpsc;
use tracing::debug;

use crate::model::Record;

/// Finalized, sorted column names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Build a schema from any set of names, sorting and deduplicating them
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            columns: set.into_iter().collect(),
        }
    }

    /// Column names in ascending order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Accumulates field names over the prefix window
#[derive(Debug)]
pub struct SchemaCollector {
    limit: usize,
    names: BTreeSet<String>,
    buffered: Vec<Record>,
}

impl SchemaCollector {
    /// Create a collector that scans at most `limit` records
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            names: BTreeSet::new(),
            buffered: Vec::new(),
        }
    }

    /// Whether the prefix window is exhausted
    pub fn is_full(&self) -> bool {
        self.buffered.len() >= self.limit
    }

    /// Record the field names of one record and keep it for output
    pub fn observe(&mut self, record: Record) {
        for field in &record.fields {
            if !self.names.contains(&field.name) {
                self.names.insert(field.name.clone());
            }
        }
        self.buffered.push(record);
    }

    /// Consume the prefix window from the channel
    ///
    /// Stops after `limit` records or when the channel is closed, whichever
    /// comes first, and returns the schema with the buffered records in
    /// arrival order.
    pub async fn collect(mut self, rx: &mut mpsc::Receiver<Record>) -> (Schema, Vec<Record>) {
        while !self.is_full() {
            match rx.recv().await {
                Some(record) => self.observe(record),
                None => break,
            }
        }
        self.finish()
    }

    /// Finalize the schema
    pub fn finish(self) -> (Schema, Vec<Record>) {
        debug!(
            "Inferred {} columns from {} records",
            self.names.len(),
            self.buffered.len()
        );
        let schema = Schema {
            columns: self.names.into_iter().collect(),
        };
        (schema, self.buffered)
    }
}
