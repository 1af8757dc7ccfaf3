//! CLI subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use chrono::NaiveDate;
use clap::Args;
use smsreport_core::config::DEFAULT_THRESHOLD;
use smsreport_core::{AppConfig, ClusterConfig, MessageFilter, ProviderCredentials, RunConfig};
use smsreport_fetch::{fetch_all, fixed_offset, split_range, TwilioSource};
use smsreport_ingest::{discover_inputs, read_table, remove_duplicates, write_csv, KeyMode};
use tracing::{info, warn};

use crate::reporting::{export_table, run_report, table_batch};
use crate::state::AppState;

/// Upper bound on concurrent fetch blocks.
pub const DEFAULT_WORKERS: usize = 300;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Input files or wildcard patterns (e.g. `relatorio-*.csv`).
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Similarity threshold in (0, 1].
    #[arg(short, long, env = "SMSREPORT_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,
    /// Keep only messages containing this text.
    #[arg(long, default_value = "")]
    pub filter: String,
    /// Treat --filter as a regular expression.
    #[arg(long)]
    pub regex: bool,
    /// Print the JSON document instead of the text report.
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub title: Option<String>,
    /// Reference campaign text shown in the overview.
    #[arg(long)]
    pub campaign_text: Option<String>,
}

#[derive(Debug, Args)]
pub struct DedupArgs {
    pub input: PathBuf,
    /// Output CSV (default: `<input>_deduplicated.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Column identifying duplicates.
    #[arg(short, long, default_value = "sid")]
    pub column: String,
    /// Compare phone numbers by their digits only.
    #[arg(long)]
    pub phone: bool,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: NaiveDate,
    /// Last day (inclusive), YYYY-MM-DD.
    #[arg(long)]
    pub end: NaiveDate,
    /// Maximum number of date blocks fetched concurrently.
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
    #[arg(long, default_value = "")]
    pub filter: String,
    #[arg(long)]
    pub regex: bool,
    /// Output CSV (default: `messages-<start>-<end>.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Also print the clustered report of the fetched messages.
    #[arg(long)]
    pub report: bool,
    #[arg(long, env = "SMSREPORT_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,
    #[arg(long, env = "TWILIO_ACCOUNT_SID", hide_env_values = true)]
    pub account_sid: Option<String>,
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// Local time zone of the campaign, in hours from UTC.
    #[arg(long, env = "SMSREPORT_UTC_OFFSET_HOURS", default_value_t = -3, allow_hyphen_values = true)]
    pub utc_offset_hours: i32,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Overrides `PORT`.
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long, env = "SMSREPORT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// `smsreport report`: cluster local export files and print the report.
pub fn report(args: ReportArgs) -> anyhow::Result<()> {
    let cluster = ClusterConfig::with_threshold(args.threshold);
    cluster.validate()?;

    let files = discover_inputs(&args.inputs)?;
    let mut batches = Vec::new();
    for path in &files {
        match read_table(path) {
            Ok(table) => batches.push(table_batch(display_name(path), table)),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    if batches.is_empty() {
        bail!("none of the {} input files could be read", files.len());
    }

    let run = RunConfig {
        filter: args.filter,
        use_regex: args.regex,
        title: args.title,
        subtitle: None,
        campaign_text: args.campaign_text,
    };
    let output = run_report(&batches, &cluster, &run)?;
    if !output.has_messages() {
        bail!("no valid messages found in the input files");
    }

    if args.json {
        println!("{}", output.document.to_json_pretty()?);
    } else {
        print!("{}", output.text);
    }
    info!(
        "Report generated: {} files, {} clusters",
        batches.len(),
        output.report.overall.total_clusters
    );
    Ok(())
}

fn default_dedup_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_deduplicated.csv", stem))
}

/// `smsreport dedup`: drop repeated rows by one column and write a CSV.
pub fn dedup(args: DedupArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        bail!("input file not found: {}", args.input.display());
    }
    let table = read_table(&args.input)?;
    let mode = if args.phone {
        KeyMode::PhoneDigits
    } else {
        KeyMode::Exact
    };
    let outcome = remove_duplicates(table, &args.column, mode)?;

    let output = match args.output {
        Some(path) if path.extension().is_none() => path.with_extension("csv"),
        Some(path) => path,
        None => default_dedup_output(&args.input),
    };
    write_csv(&output, &outcome.table)?;
    println!(
        "File '{}' written. Rows removed by column '{}': {}.",
        output.display(),
        args.column,
        outcome.removed
    );
    Ok(())
}

/// `smsreport fetch`: download the message log for a date range.
pub async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let (Some(account_sid), Some(auth_token)) = (args.account_sid, args.auth_token) else {
        bail!("provider credentials not configured (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN)");
    };
    let offset = fixed_offset(args.utc_offset_hours)?;
    let blocks = split_range(args.start, args.end, args.workers)?;
    let filter = MessageFilter::prepare(&args.filter, args.regex)?;
    let cluster = ClusterConfig::with_threshold(args.threshold);
    if args.report {
        cluster.validate()?;
    }

    info!("Fetching messages from {} to {}", args.start, args.end);
    info!("Splitting range into {} block(s)", blocks.len());
    for block in &blocks {
        info!("  Block {}: {} -> {}", block.index, block.start, block.end);
    }
    match &filter {
        Some(f) => info!("Filter ({}): {}", f.mode(), args.filter),
        None => info!("No filter applied"),
    }

    let source = Arc::new(TwilioSource::new(
        ProviderCredentials {
            account_sid,
            auth_token,
        },
        offset,
    ));
    let fetched = fetch_all(source, blocks, filter).await;
    for outcome in fetched.outcomes.iter().filter(|o| !o.is_ok()) {
        warn!(
            "Block {} ({} -> {}) failed: {}",
            outcome.block.index,
            outcome.block.start,
            outcome.block.end,
            outcome.error.as_deref().unwrap_or_default()
        );
    }
    if fetched.outcomes.iter().all(|o| !o.is_ok()) {
        bail!("every fetch block failed");
    }

    let table = export_table(&fetched, offset);
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("messages-{}-{}.csv", args.start, args.end)));
    write_csv(&output, &table)?;
    println!(
        "{} messages found of {} processed; saved to {}",
        fetched.messages.len(),
        fetched.total_processed,
        output.display()
    );

    if args.report {
        let batches = vec![table_batch(display_name(&output), table)];
        let output = run_report(&batches, &cluster, &RunConfig::default())?;
        if !output.has_messages() {
            bail!("no valid messages found in the fetched range");
        }
        print!("{}", output.text);
    }
    Ok(())
}

/// Data directory: next to the binary's parent when present, else `data`.
pub fn resolve_data_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));
    if let Some(dir) = exe_dir {
        let parent_data = dir.join("../data");
        if parent_data.exists() {
            return parent_data;
        }
    }
    PathBuf::from("data")
}

/// `smsreport serve`: run the HTTP API.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(resolve_data_dir);
    info!("Data directory: {}", data_dir.display());

    let mut config = AppConfig::from_env(&data_dir)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    let port = config.port;
    if config.credentials.is_none() {
        info!("Provider credentials not set; fetch jobs are disabled");
    }

    let state = Arc::new(AppState::new(config));
    let app = crate::routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("smsreport server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_args(inputs: Vec<String>, threshold: f64) -> ReportArgs {
        ReportArgs {
            inputs,
            threshold,
            filter: String::new(),
            regex: false,
            json: true,
            title: None,
            campaign_text: None,
        }
    }

    #[test]
    fn test_report_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.csv").to_string_lossy().to_string();
        assert!(report(report_args(vec![pattern], 0.7)).is_err());
    }

    #[test]
    fn test_report_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "body,status\nOi,delivered\n").unwrap();
        let inputs = vec![path.to_string_lossy().to_string()];
        assert!(report(report_args(inputs.clone(), 1.5)).is_err());
        assert!(report(report_args(inputs, 0.7)).is_ok());
    }

    #[test]
    fn test_report_without_messages_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "body,status\n  ,delivered\n").unwrap();
        let inputs = vec![path.to_string_lossy().to_string()];
        assert!(report(report_args(inputs, 0.7)).is_err());
    }

    #[test]
    fn test_dedup_writes_default_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("log.csv");
        std::fs::write(&input, "sid,to\nSM1,a\nSM1,b\nSM2,c\n").unwrap();
        dedup(DedupArgs {
            input: input.clone(),
            output: None,
            column: "sid".into(),
            phone: false,
        })
        .unwrap();

        let written = std::fs::read_to_string(dir.path().join("log_deduplicated.csv")).unwrap();
        assert_eq!(written, "sid,to\nSM1,a\nSM2,c\n");
    }

    #[test]
    fn test_dedup_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("log.csv");
        std::fs::write(&input, "sid,to\nSM1,a\n").unwrap();
        let err = dedup(DedupArgs {
            input,
            output: Some(dir.path().join("out")),
            column: "phone".into(),
            phone: true,
        });
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_fetch_requires_credentials() {
        let args = FetchArgs {
            start: NaiveDate::from_ymd_opt(2025, 9, 7).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 9, 8).unwrap(),
            workers: 2,
            filter: String::new(),
            regex: false,
            output: None,
            report: false,
            threshold: DEFAULT_THRESHOLD,
            account_sid: None,
            auth_token: None,
            utc_offset_hours: -3,
        };
        let err = fetch(args).await.unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }
}
