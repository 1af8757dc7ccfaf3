//! CSV output.

use std::io::Write;
use std::path::Path;

use smsreport_core::{Error, Result};
use tracing::info;

use crate::table::Table;

fn csv_err(e: csv::Error) -> Error {
    Error::Csv(e.to_string())
}

/// Write the table with its column order as the header row.
pub fn write_csv_to<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.columns).map_err(csv_err)?;
    for row in &table.rows {
        let record: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        out.write_record(&record).map_err(csv_err)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_csv_to(file, table)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
