//! smsreport ingest: read message exports (text formats and spreadsheets),
//! detect formats, dedupe rows, write CSV.

pub mod dedup;
pub mod detect;
pub mod file;
pub mod spreadsheet;
pub mod table;
pub mod write;

pub use dedup::{remove_duplicates, DedupOutcome, KeyMode};
pub use detect::{Detection, FormatDetector};
pub use file::{discover_inputs, read_table, read_table_from_bytes, read_table_from_str, FileType};
pub use spreadsheet::read_spreadsheet;
pub use table::Table;
pub use write::{write_csv, write_csv_to};
