//! Human-readable labels for input file names.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})[-/]?([01]?\d)[-/]?([0-3]?\d)").unwrap());
static YEAR_LAST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-3]?\d)[-/]?([01]?\d)[-/]?(20\d{2})").unwrap());
static DDMMYYYY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})(\d{4})$").unwrap());
static DDMM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})$").unwrap());

fn two_digits(s: &str) -> String {
    format!("{:02}", s.parse::<u32>().unwrap_or(0))
}

/// `dd/mm/yyyy` (or `dd/mm`) when the file name carries a date, otherwise
/// the file stem.
///
/// Recognized: `yyyy-mm-dd`, `dd-mm-yyyy` (separators optional, `_` and `.`
/// count as `-`), then a bare `ddmmyyyy` or `ddmm` digit run.
pub fn title_from_filename(name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let normalized = stem.replace(['_', '.'], "-");

    if let Some(c) = YEAR_FIRST.captures(&normalized) {
        return format!("{}/{}/{}", two_digits(&c[3]), two_digits(&c[2]), &c[1]);
    }
    if let Some(c) = YEAR_LAST.captures(&normalized) {
        return format!("{}/{}/{}", two_digits(&c[1]), two_digits(&c[2]), &c[3]);
    }

    let digits: String = normalized.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(c) = DDMMYYYY.captures(&digits) {
        return format!("{}/{}/{}", &c[1], &c[2], &c[3]);
    }
    if let Some(c) = DDMM.captures(&digits) {
        return format!("{}/{}", &c[1], &c[2]);
    }

    stem
}
