//! In-memory table: ordered columns plus rows keyed by column.

use smsreport_core::{normalize_header, RawRow};

/// Rows read from one source, with the column order they arrived in.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Register a column if unseen, keeping first-seen order.
    pub fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    /// Append a row, registering any new keys as columns.
    pub fn push_row(&mut self, row: RawRow) {
        for key in row.keys() {
            self.add_column(key);
        }
        self.rows.push(row);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Normalize raw header cells: empty names become `col_N` (1-based) and
/// repeated names get a numeric suffix.
pub fn normalize_headers<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (idx, cell) in raw.into_iter().enumerate() {
        let mut name = normalize_header(cell);
        if name.is_empty() {
            name = format!("col_{}", idx + 1);
        }
        if out.contains(&name) {
            let mut n = 2;
            while out.contains(&format!("{}_{}", name, n)) {
                n += 1;
            }
            name = format!("{}_{}", name, n);
        }
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreport_core::CellValue;

    #[test]
    fn test_normalize_headers() {
        let headers = normalize_headers(["Sid", " Date Sent", "", "sid"]);
        assert_eq!(headers, vec!["sid", "date_sent", "col_3", "sid_2"]);
    }

    #[test]
    fn test_push_row_tracks_columns() {
        let mut table = Table::default();
        let mut row = RawRow::new();
        row.insert("b".into(), CellValue::Null);
        row.insert("a".into(), CellValue::Null);
        table.add_column("b");
        table.push_row(row);
        assert_eq!(table.columns, vec!["b", "a"]);
        assert_eq!(table.len(), 1);
    }
}
