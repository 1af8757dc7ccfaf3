//! Fetch job routes: download a date range from the provider in the
//! background and serve the resulting CSV.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use smsreport_core::MessageFilter;
use smsreport_fetch::{fetch_all, fixed_offset, split_range, DateBlock, MessageSource, TwilioSource};
use smsreport_ingest::write_csv;
use tracing::{error, info};

use crate::commands::DEFAULT_WORKERS;
use crate::reporting::export_table;
use crate::state::{AppState, FetchJob, JobStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fetch", post(start_fetch))
        .route("/fetch/{id}", get(fetch_status))
        .route("/fetch/{id}/csv", get(fetch_csv))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub use_regex: bool,
    pub workers: Option<usize>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Run one job to completion and record the outcome.
pub async fn run_fetch_job<S: MessageSource>(
    state: Arc<AppState>,
    job_id: String,
    source: Arc<S>,
    blocks: Vec<DateBlock>,
    filter: Option<MessageFilter>,
    offset: FixedOffset,
) {
    let fetched = fetch_all(source, blocks, filter).await;
    let all_failed = fetched.outcomes.iter().all(|o| !o.is_ok());

    let error = if all_failed {
        let reasons: Vec<String> = fetched
            .outcomes
            .iter()
            .filter_map(|o| o.error.clone())
            .collect();
        Some(format!("every fetch block failed: {}", reasons.join("; ")))
    } else {
        let table = export_table(&fetched, offset);
        write_csv(&state.fetch_csv_path(&job_id), &table)
            .err()
            .map(|e| format!("failed to write export: {}", e))
    };

    if let Some(e) = &error {
        error!("Fetch job {} failed: {}", job_id, e);
    } else {
        info!(
            "Fetch job {} completed: {} found of {} processed",
            job_id,
            fetched.messages.len(),
            fetched.total_processed
        );
    }

    if let Some(job) = state.fetch_jobs.write().get_mut(&job_id) {
        job.status = if error.is_some() {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };
        job.failed_blocks = fetched.failed_blocks();
        job.processed = fetched.total_processed;
        job.found = fetched.messages.len();
        job.error = error;
        job.completed_at = Some(now_millis());
    }
}

/// POST /api/fetch: start a background fetch.
async fn start_fetch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchRequest>,
) -> impl IntoResponse {
    let Some(credentials) = state.config.credentials.clone() else {
        return error_body(
            StatusCode::SERVICE_UNAVAILABLE,
            "provider credentials not configured",
        );
    };
    let offset = match fixed_offset(state.config.utc_offset_hours) {
        Ok(o) => o,
        Err(e) => return error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let blocks = match split_range(req.start, req.end, req.workers.unwrap_or(DEFAULT_WORKERS)) {
        Ok(b) => b,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let filter = match MessageFilter::prepare(&req.filter, req.use_regex) {
        Ok(f) => f,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let job_id = uuid::Uuid::new_v4().to_string();
    let job = FetchJob {
        id: job_id.clone(),
        start: req.start,
        end: req.end,
        status: JobStatus::Running,
        blocks: blocks.len(),
        failed_blocks: 0,
        processed: 0,
        found: 0,
        error: None,
        queued_at: now_millis(),
        completed_at: None,
    };
    state.insert_fetch_job(job);
    info!("Fetch job {} queued: {} -> {}", job_id, req.start, req.end);

    let source = Arc::new(TwilioSource::new(credentials, offset));
    tokio::spawn(run_fetch_job(
        state.clone(),
        job_id.clone(),
        source,
        blocks,
        filter,
        offset,
    ));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "jobId": job_id,
            "status": JobStatus::Running,
        })),
    )
}

/// GET /api/fetch/{id}: job status.
async fn fetch_status(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let jobs = state.fetch_jobs.read();
    match jobs.get(&id) {
        Some(job) => {
            let mut body = serde_json::json!(job);
            if job.status == JobStatus::Completed {
                body["downloadUrl"] = serde_json::json!(format!("/api/fetch/{}/csv", id));
            }
            (StatusCode::OK, Json(body))
        }
        None => error_body(StatusCode::NOT_FOUND, format!("fetch job {} not found", id)),
    }
}

/// GET /api/fetch/{id}/csv: export of a completed job.
async fn fetch_csv(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let completed = state
        .fetch_jobs
        .read()
        .get(&id)
        .map(|job| job.status == JobStatus::Completed)
        .unwrap_or(false);
    if !completed {
        return error_body(StatusCode::NOT_FOUND, format!("no export for job {}", id)).into_response();
    }

    match std::fs::read(state.fetch_csv_path(&id)) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"messages-{}.csv\"", id),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_body(StatusCode::GONE, format!("export unavailable: {}", e)).into_response(),
    }
}
