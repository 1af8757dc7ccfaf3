//! Input discovery and reading for the supported export formats.

use std::path::{Path, PathBuf};

use regex::Regex;
use smsreport_core::{Error, Result};
use tracing::{info, warn};

use crate::detect::{CsvDetector, Detection, FormatDetector, JsonDetector, JsonLinesDetector};
use crate::spreadsheet::{looks_like_spreadsheet, read_spreadsheet};
use crate::table::Table;

/// Supported input file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    JsonLines,
    Csv,
    Spreadsheet,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "json" => Self::Json,
            "jsonl" | "ndjson" => Self::JsonLines,
            "csv" | "tsv" | "txt" => Self::Csv,
            "xlsx" | "xlsm" | "xltx" | "xltm" | "xls" => Self::Spreadsheet,
            _ => Self::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Detectors to try, in order.
    pub fn detectors(&self) -> Vec<Box<dyn FormatDetector>> {
        match self {
            // A `.json` file may still hold JSON Lines.
            Self::Json => vec![Box::new(JsonDetector), Box::new(JsonLinesDetector)],
            Self::JsonLines => vec![Box::new(JsonLinesDetector)],
            Self::Csv => vec![Box::new(CsvDetector)],
            Self::Spreadsheet => Vec::new(),
            Self::Unknown => vec![
                Box::new(JsonDetector),
                Box::new(JsonLinesDetector),
                Box::new(CsvDetector),
            ],
        }
    }
}

/// Parse already-loaded text content. `file_name` picks the detector order.
pub fn read_table_from_str(content: &str, file_name: &str) -> Result<Table> {
    let file_type = FileType::from_path(Path::new(file_name));
    if file_type == FileType::Spreadsheet {
        return read_spreadsheet(content.as_bytes(), file_name);
    }

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    for detector in file_type.detectors() {
        match detector.detect(content) {
            Detection::Parsed(table) => {
                info!(
                    "{}: read {} rows as {}",
                    file_name,
                    table.len(),
                    detector.name()
                );
                return Ok(table);
            }
            Detection::Unrecognized => continue,
        }
    }

    Err(Error::Ingest(format!("{}: unrecognized format", file_name)))
}

/// Parse raw file content. Spreadsheets are recognized by extension, or by
/// their container signature when the extension says nothing.
pub fn read_table_from_bytes(bytes: &[u8], file_name: &str) -> Result<Table> {
    match FileType::from_path(Path::new(file_name)) {
        FileType::Spreadsheet => read_spreadsheet(bytes, file_name),
        FileType::Unknown if looks_like_spreadsheet(bytes) => read_spreadsheet(bytes, file_name),
        _ => read_table_from_str(&String::from_utf8_lossy(bytes), file_name),
    }
}

/// Read a file into a table.
pub fn read_table(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input");
    read_table_from_bytes(&bytes, name)
}

fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| Error::Config(format!("invalid pattern {}: {}", pattern, e)))
}

/// Expand wildcard patterns (`*`, `?` in the file name) and keep existing
/// plain paths. Result is sorted and deduplicated.
pub fn discover_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();

    for item in patterns {
        let path = Path::new(item);
        if !item.contains('*') && !item.contains('?') {
            if path.exists() {
                found.push(path.to_path_buf());
            } else {
                warn!("Input not found: {}", item);
            }
            continue;
        }

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name_pattern = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let re = wildcard_regex(name_pattern)?;

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", dir.display(), e);
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if re.is_match(&file_name) && entry.path().is_file() {
                found.push(dir.join(file_name));
            }
        }
    }

    found.sort();
    found.dedup();
    if found.is_empty() {
        return Err(Error::NotFound(
            "no input files matched the given paths or patterns".into(),
        ));
    }
    Ok(found)
}
