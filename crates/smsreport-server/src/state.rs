//! Shared application state.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::Serialize;
use smsreport_core::AppConfig;
use tracing::warn;

/// Rendered reports kept in memory.
pub const MAX_CACHED_REPORTS: usize = 50;
/// Fetch jobs kept in the job map. Running jobs are never evicted.
pub const MAX_FETCH_JOBS: usize = 50;

/// A report rendered by the HTTP API, available for download by id.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: String,
    pub created_at: String,
    pub text: String,
}

/// Fetch job status.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// A background fetch started through the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchJob {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: JobStatus,
    pub blocks: usize,
    pub failed_blocks: usize,
    pub processed: usize,
    pub found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub queued_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: AppConfig,
    reports: RwLock<VecDeque<StoredReport>>,
    pub fetch_jobs: RwLock<HashMap<String, FetchJob>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            reports: RwLock::new(VecDeque::new()),
            fetch_jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Where a fetch job writes its CSV export.
    pub fn fetch_csv_path(&self, job_id: &str) -> PathBuf {
        self.config
            .data_paths
            .reports
            .join(format!("fetch-{}.csv", job_id))
    }

    /// Register a job, then drop the oldest finished jobs (and their
    /// exports) beyond [`MAX_FETCH_JOBS`].
    pub fn insert_fetch_job(&self, job: FetchJob) {
        let mut jobs = self.fetch_jobs.write();
        jobs.insert(job.id.clone(), job);
        if jobs.len() <= MAX_FETCH_JOBS {
            return;
        }

        let mut finished: Vec<(i64, String)> = jobs
            .values()
            .filter(|j| j.status != JobStatus::Running)
            .map(|j| (j.completed_at.unwrap_or(j.queued_at), j.id.clone()))
            .collect();
        finished.sort();
        let excess = jobs.len() - MAX_FETCH_JOBS;
        for (_, id) in finished.into_iter().take(excess) {
            jobs.remove(&id);
            let csv = self.fetch_csv_path(&id);
            if csv.exists() {
                if let Err(e) = std::fs::remove_file(&csv) {
                    warn!("Failed to remove export {}: {}", csv.display(), e);
                }
            }
        }
    }

    fn report_path(&self, id: &str) -> PathBuf {
        self.config.data_paths.reports.join(format!("{}.txt", id))
    }

    /// Keep a rendered report, evicting the oldest beyond the cache bound.
    /// The text is also written under the reports directory.
    pub fn store_report(&self, text: String) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        if let Err(e) = std::fs::write(self.report_path(&id), &text) {
            warn!("Failed to persist report {}: {}", id, e);
        }

        let mut reports = self.reports.write();
        reports.push_back(StoredReport {
            id: id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            text,
        });
        while reports.len() > MAX_CACHED_REPORTS {
            reports.pop_front();
        }
        id
    }

    /// Look a report up in memory, then on disk.
    pub fn report_text(&self, id: &str) -> Option<String> {
        if let Some(report) = self.reports.read().iter().find(|r| r.id == id) {
            return Some(report.text.clone());
        }
        // Ids are uuids; anything else never reaches the filesystem.
        uuid::Uuid::parse_str(id).ok()?;
        std::fs::read_to_string(self.report_path(id)).ok()
    }

    pub fn cached_reports(&self) -> usize {
        self.reports.read().len()
    }

    /// `(id, created_at)` of cached reports, newest first.
    pub fn recent_reports(&self) -> Vec<(String, String)> {
        self.reports
            .read()
            .iter()
            .rev()
            .map(|r| (r.id.clone(), r.created_at.clone()))
            .collect()
    }
}
