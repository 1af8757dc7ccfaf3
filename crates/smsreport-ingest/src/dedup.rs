//! Duplicate row removal keyed on one column.

use std::collections::HashSet;

use smsreport_core::{normalize_header, Error, Result};
use tracing::info;

use crate::table::Table;

/// How a cell is turned into a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// Trimmed cell text.
    #[default]
    Exact,
    /// Digits only, so `+55 (11) 9999-0000` and `5511999990000` collide.
    PhoneDigits,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub table: Table,
    pub removed: usize,
}

/// Digits of a phone-like value, or the trimmed text when it has none.
pub fn phone_key(text: &str) -> String {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        text.trim().to_string()
    } else {
        digits
    }
}

/// Keep the first row per key. Rows whose key is empty are always kept.
pub fn remove_duplicates(table: Table, column: &str, mode: KeyMode) -> Result<DedupOutcome> {
    let column = normalize_header(column);
    if !table.has_column(&column) {
        return Err(Error::Ingest(format!(
            "column '{}' not found; available columns: {}",
            column,
            table.columns.join(", ")
        )));
    }

    let original = table.len();
    let mut seen: HashSet<String> = HashSet::new();
    let Table { columns, rows } = table;

    let rows: Vec<_> = rows
        .into_iter()
        .filter(|row| {
            let text = row.get(&column).and_then(|c| c.as_text()).unwrap_or_default();
            let key = match mode {
                KeyMode::Exact => text.trim().to_string(),
                KeyMode::PhoneDigits => phone_key(&text),
            };
            key.is_empty() || seen.insert(key)
        })
        .collect();

    let removed = original - rows.len();
    info!(
        "Removed {} duplicate rows by column '{}' ({} kept)",
        removed,
        column,
        rows.len()
    );

    Ok(DedupOutcome {
        table: Table { columns, rows },
        removed,
    })
}
