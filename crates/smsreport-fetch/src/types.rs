//! Fetch types.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use smsreport_core::{CellValue, RawRow};

/// Column order of a provider export.
pub const EXPORT_COLUMNS: [&str; 12] = [
    "sid",
    "from",
    "to",
    "status",
    "date_created",
    "date_sent",
    "error_code",
    "error_message",
    "num_segments",
    "price",
    "direction",
    "body",
];

/// An inclusive sub-range of days fetched by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateBlock {
    /// 1-based position in the split.
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One message as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchedMessage {
    pub sid: String,
    pub from: String,
    pub to: String,
    pub status: String,
    pub date_created: Option<DateTime<Utc>>,
    pub date_sent: Option<DateTime<Utc>>,
    pub error_code: String,
    pub error_message: String,
    pub num_segments: String,
    pub price: String,
    pub direction: String,
    pub body: String,
}

impl FetchedMessage {
    /// Ordering timestamp: sent, else created, else the minimum.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.date_sent
            .or(self.date_created)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Row with the export columns. Timestamps are rendered in `offset`.
    pub fn to_row(&self, offset: FixedOffset) -> RawRow {
        let stamp = |dt: Option<DateTime<Utc>>| match dt {
            Some(dt) => CellValue::Text(
                dt.with_timezone(&offset)
                    .to_rfc3339_opts(SecondsFormat::Secs, false),
            ),
            None => CellValue::Null,
        };
        let text = |s: &str| {
            if s.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(s.to_string())
            }
        };

        let values = [
            text(&self.sid),
            text(&self.from),
            text(&self.to),
            text(&self.status),
            stamp(self.date_created),
            stamp(self.date_sent),
            text(&self.error_code),
            text(&self.error_message),
            text(&self.num_segments),
            text(&self.price),
            text(&self.direction),
            // Body is kept as-is so the normalizer sees the same text.
            CellValue::Text(self.body.clone()),
        ];
        EXPORT_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .zip(values)
            .collect()
    }
}

/// What happened to one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    pub block: DateBlock,
    /// Messages seen before filtering.
    pub processed: usize,
    /// Messages kept after filtering.
    pub found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BlockOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Merged result of a fan-out fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    /// One entry per block, in block order.
    pub outcomes: Vec<BlockOutcome>,
    /// Deduplicated by sid, sorted by timestamp then sid.
    pub messages: Vec<FetchedMessage>,
    pub total_processed: usize,
}

impl FetchReport {
    pub fn failed_blocks(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }
}
