//! Format detectors. Each one either parses the content or declines it;
//! callers try them in order.

use smsreport_core::{row_from_json, CellValue, RawRow};
use tracing::{debug, warn};

use crate::table::{normalize_headers, Table};

/// Outcome of offering content to a detector.
#[derive(Debug)]
pub enum Detection {
    Parsed(Table),
    Unrecognized,
}

/// A single input format.
pub trait FormatDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, content: &str) -> Detection;
}

/// A JSON array of objects, or a single object.
pub struct JsonDetector;

/// One JSON object per line.
pub struct JsonLinesDetector;

/// Delimited text with a header row.
pub struct CsvDetector;

impl FormatDetector for JsonDetector {
    fn name(&self) -> &'static str {
        "json"
    }

    fn detect(&self, content: &str) -> Detection {
        let value: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                debug!("Not a JSON document: {}", e);
                return Detection::Unrecognized;
            }
        };

        let mut table = Table::default();
        match value {
            serde_json::Value::Object(obj) => table.push_row(row_from_json(obj)),
            serde_json::Value::Array(items) => {
                for (idx, item) in items.into_iter().enumerate() {
                    match item {
                        serde_json::Value::Object(obj) => table.push_row(row_from_json(obj)),
                        _ => warn!("Skipping non-object JSON element at index {}", idx),
                    }
                }
            }
            _ => return Detection::Unrecognized,
        }
        Detection::Parsed(table)
    }
}

impl FormatDetector for JsonLinesDetector {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn detect(&self, content: &str) -> Detection {
        let mut table = Table::default();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(serde_json::Value::Object(obj)) => table.push_row(row_from_json(obj)),
                Ok(_) => warn!("Line {}: not a JSON object, skipped", line_num + 1),
                Err(e) => warn!("Line {}: invalid JSON ({}), skipped", line_num + 1, e),
            }
        }
        if table.is_empty() {
            Detection::Unrecognized
        } else {
            Detection::Parsed(table)
        }
    }
}

/// Candidate delimiters; comma wins ties.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Pick the delimiter that occurs most often in the first 1024 bytes.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample = &content.as_bytes()[..content.len().min(1024)];
    let count = |d: u8| sample.iter().filter(|b| **b == d).count();
    let mut best = b',';
    for d in DELIMITERS {
        if count(d) > count(best) {
            best = d;
        }
    }
    best
}

impl FormatDetector for CsvDetector {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn detect(&self, content: &str) -> Detection {
        if content.trim().is_empty() {
            return Detection::Unrecognized;
        }
        let delimiter = sniff_delimiter(content);
        debug!("CSV delimiter detected: {:?}", delimiter as char);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = match reader.headers() {
            Ok(h) => normalize_headers(h.iter()),
            Err(e) => {
                debug!("CSV header unreadable: {}", e);
                return Detection::Unrecognized;
            }
        };

        let mut table = Table::default();
        for name in &headers {
            table.add_column(name);
        }

        for (idx, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!("CSV record {} unreadable ({}), skipped", idx + 2, e);
                    continue;
                }
            };
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let row: RawRow = headers
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = match record.get(i) {
                        Some(field) if !field.is_empty() => CellValue::Text(field.to_string()),
                        _ => CellValue::Null,
                    };
                    (name.clone(), value)
                })
                .collect();
            table.rows.push(row);
        }
        Detection::Parsed(table)
    }
}
