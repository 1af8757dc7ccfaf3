//! Spreadsheet reader (xlsx, xlsm, xls, ods) for the first worksheet.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use smsreport_core::{CellValue, Error, RawRow, Result};
use tracing::{info, warn};

use crate::table::{normalize_headers, Table};

/// Leading bytes of zip containers (xlsx, ods) and OLE compound files (xls).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

pub fn looks_like_spreadsheet(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

/// Date-styled cells become `Date` (midnight) or `DateTime`; plain numbers
/// stay numeric so serial day numbers reach the normalizer untouched.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(ts) if ts.time() == NaiveTime::MIN => CellValue::Date(ts.date()),
            Some(ts) => CellValue::DateTime(ts),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => iso_cell(s),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn iso_cell(s: &str) -> CellValue {
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(ts);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    CellValue::Text(s.to_string())
}

/// Read the first worksheet. The first non-empty row is the header;
/// rows with only blank cells are skipped.
pub fn read_spreadsheet(bytes: &[u8], file_name: &str) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::Ingest(format!("{}: cannot open spreadsheet: {}", file_name, e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Ingest(format!("{}: workbook has no sheets", file_name)))?
        .map_err(|e| Error::Ingest(format!("{}: cannot read first sheet: {}", file_name, e)))?;

    let mut rows = range
        .rows()
        .skip_while(|row| row.iter().all(|c| cell_value(c).is_blank()));

    let mut table = Table::default();
    let Some(header_row) = rows.next() else {
        warn!("{}: first sheet is empty", file_name);
        return Ok(table);
    };
    let header_text: Vec<String> = header_row
        .iter()
        .map(|c| cell_value(c).to_string())
        .collect();
    let columns = normalize_headers(header_text.iter().map(String::as_str));
    for column in &columns {
        table.add_column(column);
    }

    for raw in rows {
        let cells: Vec<CellValue> = raw.iter().map(cell_value).collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }
        let row: RawRow = columns.iter().cloned().zip(cells).collect();
        table.push_row(row);
    }

    info!("{}: read {} rows from spreadsheet", file_name, table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPAIGN: &[u8] = include_bytes!("../tests/fixtures/campaign.xlsx");

    #[test]
    fn test_reads_first_sheet_with_typed_cells() {
        assert!(looks_like_spreadsheet(CAMPAIGN));
        let table = read_spreadsheet(CAMPAIGN, "campaign.xlsx").unwrap();

        assert_eq!(
            table.columns,
            vec!["sid", "body", "status", "date_sent", "num_segments"]
        );
        assert_eq!(table.len(), 2);

        let first = &table.rows[0];
        assert_eq!(first["sid"], CellValue::Text("SM1".into()));
        assert_eq!(first["status"], CellValue::Text("delivered".into()));
        // Unstyled serial day number stays numeric.
        assert_eq!(first["date_sent"], CellValue::Number(45907.5));
        assert_eq!(first["num_segments"], CellValue::Number(1.0));

        let second = &table.rows[1];
        assert_eq!(
            second["date_sent"],
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 9, 8).unwrap())
        );
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Null);
        assert_eq!(cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            cell_value(&Data::DateTimeIso("2025-09-07T10:30:00".into())),
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2025, 9, 7)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_garbage_is_ingest_error() {
        let err = read_spreadsheet(b"PK\x03\x04not really a zip", "broken.xlsx").unwrap_err();
        assert!(matches!(err, Error::Ingest(_)));
    }
}
