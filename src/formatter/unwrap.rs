//! Ordered unwrap rules for object-shaped values
//!
//! Wrapper objects such as `{"value": 42}` or `{"app": {...}}` are unwrapped
//! to their payload before formatting. Rules are tried in table order and
//! the first one that selects a value wins.

use std::collections::BTreeMap;

use crate::model::Value;

/// A named selector that picks the payload out of a wrapper object
#[derive(Debug, Clone, Copy)]
pub struct UnwrapRule {
    /// Rule name, for diagnostics and tests
    pub name: &'static str,
    /// Returns the payload when the rule applies
    pub select: fn(&BTreeMap<String, Value>) -> Option<&Value>,
}

/// Unwrap rules in priority order
pub const UNWRAP_RULES: [UnwrapRule; 5] = [
    UnwrapRule {
        name: "single-entry",
        select: single_entry,
    },
    UnwrapRule {
        name: "value",
        select: value_key,
    },
    UnwrapRule {
        name: "text",
        select: text_key,
    },
    // Link to another application
    UnwrapRule {
        name: "app",
        select: app_key,
    },
    // Date and time ranges
    UnwrapRule {
        name: "start_utc",
        select: start_utc_key,
    },
];

/// Apply the first matching rule
///
/// # Returns
/// * `Option<(&'static str, &Value)>` - Name of the rule that applied and the selected payload
pub fn first_unwrap(map: &BTreeMap<String, Value>) -> Option<(&'static str, &Value)> {
    UNWRAP_RULES
        .iter()
        .find_map(|rule| (rule.select)(map).map(|inner| (rule.name, inner)))
}

fn single_entry(map: &BTreeMap<String, Value>) -> Option<&Value> {
    if map.len() == 1 {
        map.values().next()
    } else {
        None
    }
}

fn value_key(map: &BTreeMap<String, Value>) -> Option<&Value> {
    map.get("value")
}

fn text_key(map: &BTreeMap<String, Value>) -> Option<&Value> {
    map.get("text")
}

fn app_key(map: &BTreeMap<String, Value>) -> Option<&Value> {
    map.get("app")
}

fn start_utc_key(map: &BTreeMap<String, Value>) -> Option<&Value> {
    map.get("start_utc")
}
