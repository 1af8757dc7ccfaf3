//! Clustering types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use smsreport_core::CellValue;

/// Binary delivery status used by the clustering core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusClass {
    Delivered,
    Other,
}

impl StatusClass {
    pub fn label(&self) -> &'static str {
        match self {
            StatusClass::Delivered => "Delivered",
            StatusClass::Other => "Not delivered",
        }
    }
}

/// A normalized message record. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Originating file or batch.
    pub source_id: String,
    /// Original text, trimmed.
    pub raw_body: String,
    /// Comparison form; see [`crate::normalize::normalize_body`].
    pub normalized_body: String,
    pub status_raw: String,
    pub status_class: StatusClass,
    pub date: Option<NaiveDate>,
    /// Side data (destination, sid, raw timestamps). Not used for clustering.
    pub metadata: BTreeMap<String, CellValue>,
}

/// A group of similar messages anchored on its first member.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub representative_normalized: String,
    pub representative_raw: String,
    pub members: Vec<Message>,
}

impl Cluster {
    pub(crate) fn seeded_by(message: &Message) -> Self {
        Self {
            representative_normalized: message.normalized_body.clone(),
            representative_raw: message.raw_body.clone(),
            members: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.members.len()
    }

    /// The dedicated cluster for bodies that normalize to nothing.
    pub fn is_no_body(&self) -> bool {
        self.representative_normalized.is_empty()
    }

    /// Distinct source ids of the members, sorted.
    pub fn sources(&self) -> BTreeSet<String> {
        self.members.iter().map(|m| m.source_id.clone()).collect()
    }
}

/// Delivered / other tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "DELIVERED")]
    pub delivered: usize,
    #[serde(rename = "OTHER")]
    pub other: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: StatusClass) {
        match status {
            StatusClass::Delivered => self.delivered += 1,
            StatusClass::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.delivered + self.other
    }
}

/// Label for messages whose status cell is empty.
pub const NO_STATUS: &str = "no_status";

/// Counts per raw provider status (`delivered`, `undelivered`, `failed`,
/// `sent`, `queued`, ...), keyed by the trimmed lowercase status text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusBreakdown(BTreeMap<String, usize>);

impl StatusBreakdown {
    pub fn add(&mut self, status_raw: &str) {
        self.add_n(status_raw, 1);
    }

    pub fn add_n(&mut self, status_raw: &str, n: usize) {
        let key = status_raw.trim().to_lowercase();
        let key = if key.is_empty() { NO_STATUS.to_string() } else { key };
        *self.0.entry(key).or_default() += n;
    }

    pub fn get(&self, status: &str) -> usize {
        self.0.get(status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest counts first, ties by status name.
    pub fn most_common(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

/// Counts for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterStats {
    pub total: usize,
    #[serde(rename = "byStatus")]
    pub by_status: StatusCounts,
    /// Undated messages are left out here but counted above.
    #[serde(rename = "byDate")]
    pub by_date: BTreeMap<NaiveDate, StatusCounts>,
}

/// Rollup across all clusters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallStats {
    pub total: usize,
    #[serde(rename = "byStatus")]
    pub by_status: StatusCounts,
    #[serde(rename = "byDate")]
    pub by_date: BTreeMap<NaiveDate, StatusCounts>,
    #[serde(rename = "totalClusters")]
    pub total_clusters: usize,
    pub dates: BTreeSet<NaiveDate>,
    #[serde(rename = "byRawStatus")]
    pub by_raw_status: StatusBreakdown,
    /// Raw status counts per source id.
    #[serde(rename = "bySource")]
    pub by_source: BTreeMap<String, StatusBreakdown>,
}

/// Presentation-ready view of one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub template: String,
    pub representative: String,
    pub samples: Vec<String>,
    pub stats: ClusterStats,
    pub sources: Vec<String>,
}

/// One input batch: rows plus the id of the file they came from.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source_id: String,
    pub rows: Vec<smsreport_core::RawRow>,
}

/// Result of running the cluster pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterReport {
    pub threshold: f64,
    #[serde(rename = "inputRows")]
    pub input_rows: usize,
    /// Rows without a body.
    pub dropped: usize,
    /// Rows rejected by the content filter.
    #[serde(rename = "filteredOut")]
    pub filtered_out: usize,
    pub sources: Vec<String>,
    pub overall: OverallStats,
    pub clusters: Vec<ClusterSummary>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}
