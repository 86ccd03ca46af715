//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per domain table. JSON blob columns are stored as TEXT;
//! reads are lenient: a corrupt blob degrades to its default shape instead
//! of failing the whole row.

mod checkin;
mod hospital;
mod insurance;
mod lab_report;
mod overall_report;
mod prescription;

pub use checkin::*;
pub use hospital::*;
pub use insurance::*;
pub use lab_report::*;
pub use overall_report::*;
pub use prescription::*;

use serde_json::Value;

use super::DatabaseError;

/// Serialize a JSON column value to TEXT.
pub(crate) fn json_column<T: serde::Serialize>(value: &T) -> Result<String, DatabaseError> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize an optional JSON blob to an optional TEXT column.
pub(crate) fn opt_json_column(value: &Option<Value>) -> Result<Option<String>, DatabaseError> {
    value.as_ref().map(|v| json_column(v)).transpose()
}

/// Parse an optional TEXT column back into a JSON value. Corrupt or
/// missing text yields None.
pub(crate) fn parse_value(raw: Option<String>) -> Option<Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

/// Parse a TEXT column holding a JSON array of strings. Corrupt or
/// missing text yields an empty list.
pub(crate) fn parse_string_array(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

/// Parse a TEXT column holding a JSON array of arbitrary objects.
pub(crate) fn parse_value_array(raw: Option<String>) -> Vec<Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_column_round_trip() {
        let text = json_column(&vec!["fatigue".to_string(), "headache".to_string()]).unwrap();
        assert_eq!(parse_string_array(Some(text)), vec!["fatigue", "headache"]);
    }

    #[test]
    fn corrupt_blob_degrades_to_default() {
        assert!(parse_string_array(Some("{not json".into())).is_empty());
        assert!(parse_value(Some("{not json".into())).is_none());
        assert!(parse_value_array(None).is_empty());
    }

    #[test]
    fn opt_json_column_handles_none() {
        assert_eq!(opt_json_column(&None).unwrap(), None);
        let some = opt_json_column(&Some(json!({"a": 1}))).unwrap();
        assert_eq!(some.as_deref(), Some(r#"{"a":1}"#));
    }
}
