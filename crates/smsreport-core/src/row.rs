//! Raw tabular row model shared by readers, the fetcher and the normalizer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// One cell of an input row, as handed over by an upstream reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// A row keyed by normalized column name.
pub type RawRow = BTreeMap<String, CellValue>;

impl CellValue {
    /// True for null cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, `None` for null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Borrow the inner string of a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            serde_json::Value::String(s) => CellValue::Text(s),
            nested => CellValue::Text(nested.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(CellValue::from)
    }
}

/// Normalize a column header: trim, lowercase, whitespace runs → `_`.
pub fn normalize_header(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Build a row from a JSON object, normalizing its keys.
pub fn row_from_json(object: serde_json::Map<String, serde_json::Value>) -> RawRow {
    object
        .into_iter()
        .map(|(k, v)| (normalize_header(&k), CellValue::from(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Date Sent "), "date_sent");
        assert_eq!(normalize_header("Error\tCode"), "error_code");
        assert_eq!(normalize_header("BODY"), "body");
    }

    #[test]
    fn test_number_display() {
        assert_eq!(CellValue::Number(45000.0).to_string(), "45000");
        assert_eq!(CellValue::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_from_json() {
        let row = row_from_json(
            serde_json::json!({"Body": "hi", "Num Segments": 2, "x": null, "nested": [1]})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(row["body"], CellValue::Text("hi".into()));
        assert_eq!(row["num_segments"], CellValue::Number(2.0));
        assert!(row["x"].is_blank());
        assert_eq!(row["nested"], CellValue::Text("[1]".into()));
    }

    #[test]
    fn test_deserialize_row() {
        let row: RawRow = serde_json::from_str(r#"{"body": "x", "status": null}"#).unwrap();
        assert_eq!(row["body"].as_str(), Some("x"));
        assert_eq!(row["status"], CellValue::Null);
    }
}
