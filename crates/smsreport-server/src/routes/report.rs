//! Report routes: build a report from posted rows or an uploaded export,
//! then download the rendered text.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use smsreport_cluster::SourceBatch;
use smsreport_core::{row_from_json, Error, RunConfig};
use smsreport_ingest::read_table_from_bytes;
use tracing::{info, warn};

use crate::reporting::{run_report, table_batch};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/report", post(create_report))
        .route("/report/upload", post(upload_report))
        .route("/reports", get(list_reports))
        .route("/reports/{id}", get(download_report))
}

/// Body of `POST /api/report`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub threshold: Option<f64>,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub use_regex: bool,
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub campaign_text: Option<String>,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

fn error_response(e: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        Error::Config(_) | Error::Ingest(_) | Error::Csv(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, e.to_string())
}

/// Cluster off the async runtime, cache the rendered text and answer with
/// the report document plus its download id.
async fn respond(
    state: Arc<AppState>,
    batches: Vec<SourceBatch>,
    threshold: Option<f64>,
    run: RunConfig,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut cluster = state.config.cluster.clone();
    if let Some(t) = threshold {
        cluster.threshold = t;
    }

    let joined = tokio::task::spawn_blocking(move || run_report(&batches, &cluster, &run)).await;
    let output = match joined {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return error_response(&e),
        Err(e) => {
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("report task failed: {}", e),
            )
        }
    };

    if !output.has_messages() {
        return error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "no valid messages found in the input",
        );
    }

    let mut body = match serde_json::to_value(&output.document) {
        Ok(v) => v,
        Err(e) => return error_response(&Error::Json(e)),
    };
    let id = state.store_report(output.text);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("reportId".into(), serde_json::json!(id));
    }
    info!(
        "Report {} ready: {} messages in {} clusters",
        id, output.report.overall.total, output.report.overall.total_clusters
    );
    (StatusCode::OK, Json(body))
}

/// POST /api/report: cluster rows posted as JSON objects.
async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReportRequest>,
) -> impl IntoResponse {
    let batch = SourceBatch {
        source_id: req.source_id.unwrap_or_else(|| "request".to_string()),
        rows: req.rows.into_iter().map(row_from_json).collect(),
    };
    let run = RunConfig {
        filter: req.filter,
        use_regex: req.use_regex,
        title: req.title,
        subtitle: None,
        campaign_text: req.campaign_text,
    };
    respond(state, vec![batch], req.threshold, run).await
}

fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], "").replace("..", "");
    FsPath::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

/// Save an upload, suffixing a timestamp when the name is taken.
fn save_upload(uploads: &FsPath, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
    let mut path = uploads.join(filename);
    if path.exists() {
        let stem = FsPath::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let new_name = match FsPath::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_{}.{}", stem, ts, ext),
            None => format!("{}_{}", stem, ts),
        };
        path = uploads.join(new_name);
    }
    std::fs::write(path, bytes)
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

/// POST /api/report/upload: cluster one or more uploaded export files.
async fn upload_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut batches = Vec::new();
    let mut threshold = None;
    let mut run = RunConfig::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_body(StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", e)),
        };
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(sanitize_filename) {
            let bytes = match field.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    return error_body(StatusCode::BAD_REQUEST, format!("{}: read failed: {}", filename, e))
                }
            };
            if bytes.is_empty() {
                continue;
            }
            if let Err(e) = save_upload(&state.config.data_paths.uploads, &filename, &bytes) {
                warn!("Could not keep upload {}: {}", filename, e);
            }
            match read_table_from_bytes(&bytes, &filename) {
                Ok(table) => batches.push(table_batch(filename, table)),
                Err(e) => return error_response(&e),
            }
            continue;
        }

        let value = match field.text().await {
            Ok(v) => v,
            Err(e) => return error_body(StatusCode::BAD_REQUEST, format!("{}: {}", name, e)),
        };
        match name.as_str() {
            "threshold" if !value.trim().is_empty() => match value.trim().parse::<f64>() {
                Ok(t) => threshold = Some(t),
                Err(_) => {
                    return error_body(StatusCode::BAD_REQUEST, format!("threshold is not a number: {}", value))
                }
            },
            "filter" => run.filter = value,
            "useRegex" => run.use_regex = truthy(&value),
            "title" => run.title = Some(value).filter(|v| !v.trim().is_empty()),
            "campaignText" => run.campaign_text = Some(value).filter(|v| !v.trim().is_empty()),
            _ => {}
        }
    }

    if batches.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "no file uploaded");
    }
    respond(state, batches, threshold, run).await
}

/// GET /api/reports: cached report ids, newest first.
async fn list_reports(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let reports: Vec<_> = state
        .recent_reports()
        .into_iter()
        .map(|(id, created_at)| serde_json::json!({ "id": id, "createdAt": created_at }))
        .collect();
    Json(serde_json::json!({
        "total": reports.len(),
        "reports": reports,
    }))
}

/// GET /api/reports/{id}: rendered text report.
async fn download_report(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.report_text(&id) {
        Some(text) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"report-{}.txt\"", id),
                ),
            ],
            text,
        )
            .into_response(),
        None => error_body(StatusCode::NOT_FOUND, format!("report {} not found", id)).into_response(),
    }
}
