//! Record normalizer: raw rows into canonical [`Message`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use smsreport_core::{CellValue, RawRow};

use crate::types::{Message, StatusClass};

/// Body columns, in lookup order.
pub const BODY_FIELDS: &[&str] = &[
    "body",
    "texto",
    "message",
    "mensagem",
    "message_body",
    "content",
    "copy",
    "msg",
];

/// Timestamp columns, most reliable first (sent before created).
pub const DATE_FIELDS: &[&str] = &[
    "date_sent",
    "data_envio",
    "sent_at",
    "date_created",
    "data_criacao",
];

/// Side-data columns carried into [`Message::metadata`].
const METADATA_FIELDS: &[(&str, &[&str])] = &[
    ("to", &["to", "destino", "destination"]),
    ("sid", &["sid"]),
    ("date_sent", &["date_sent"]),
    ("date_created", &["date_created"]),
];

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S+").unwrap());
// Raw logs sometimes lose the colon: `http//host/path`.
static URL_NO_COLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhttps?//\S+").unwrap());
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]+").unwrap());

/// Day zero of spreadsheet serial dates.
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Normalize a body for similarity comparison.
///
/// URLs (both `scheme://` and the colon-less variant) and punctuation become
/// spaces, whitespace collapses, and the result is lowercased.
pub fn normalize_body(text: &str) -> String {
    let raw = text.trim();
    if raw.is_empty() {
        return String::new();
    }
    let temp = URL_RE.replace_all(raw, " ");
    let temp = URL_NO_COLON_RE.replace_all(&temp, " ");
    let temp = NON_WORD_RE.replace_all(&temp, " ");
    temp.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Binary status collapse.
pub fn map_status(value: &str) -> StatusClass {
    if value.trim().eq_ignore_ascii_case("delivered") {
        StatusClass::Delivered
    } else {
        StatusClass::Other
    }
}

/// Convert a spreadsheet serial day number into a timestamp.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let micros = (serial * 86_400_000_000.0).round();
    if micros.abs() > 1e17 {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::microseconds(micros as i64))
}

/// Parse a timestamp-like string into a calendar date.
///
/// Accepts ISO-8601 (with or without offset), `YYYY-MM-DD HH:MM:SS`,
/// `DD/MM/YYYY HH:MM:SS` and `YYYY-MM-DD`. Offset timestamps keep the
/// date of their own offset.
pub fn parse_date_str(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Date of a single cell, if it holds something date-like.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Number(n) => serial_to_datetime(*n).map(|dt| dt.date()),
        CellValue::Text(s) => parse_date_str(s),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

/// First parseable date among [`DATE_FIELDS`].
pub fn extract_date(row: &RawRow) -> Option<NaiveDate> {
    DATE_FIELDS
        .iter()
        .filter_map(|key| row.get(*key))
        .find_map(parse_date)
}

/// Trimmed body text from the first non-blank body column.
pub fn extract_body(row: &RawRow) -> Option<String> {
    BODY_FIELDS
        .iter()
        .filter_map(|key| row.get(*key))
        .filter_map(|v| v.as_text())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Turn one raw row into a [`Message`]. Rows without a body yield `None`.
pub fn normalize(row: &RawRow, source_id: &str) -> Option<Message> {
    let raw_body = extract_body(row)?;

    let status_raw = row
        .get("status")
        .and_then(|v| v.as_text())
        .unwrap_or_default();

    let mut metadata = BTreeMap::new();
    for (name, keys) in METADATA_FIELDS {
        if let Some(value) = keys
            .iter()
            .filter_map(|k| row.get(*k))
            .find(|v| !v.is_blank())
        {
            metadata.insert(name.to_string(), value.clone());
        }
    }

    Some(Message {
        source_id: source_id.to_string(),
        normalized_body: normalize_body(&raw_body),
        raw_body,
        status_class: map_status(&status_raw),
        status_raw,
        date: extract_date(row),
        metadata,
    })
}
