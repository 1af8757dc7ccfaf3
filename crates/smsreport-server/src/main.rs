//! smsreport binary.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use smsreport_server::commands::{self, DedupArgs, FetchArgs, ReportArgs, ServeArgs};

/// Group near-duplicate SMS messages and report delivery per template.
#[derive(Parser, Debug)]
#[command(name = "smsreport", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster export files and print the report.
    Report(ReportArgs),
    /// Remove duplicated rows by a column.
    Dedup(DedupArgs),
    /// Download the message log for a date range.
    Fetch(FetchArgs),
    /// Start the HTTP server (default).
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Report(args)) => commands::report(args),
        Some(Commands::Dedup(args)) => commands::dedup(args),
        Some(Commands::Fetch(args)) => commands::fetch(args).await,
        Some(Commands::Serve(args)) => commands::serve(args).await,
        None => {
            commands::serve(ServeArgs {
                port: None,
                data_dir: std::env::var_os("SMSREPORT_DATA_DIR").map(Into::into),
            })
            .await
        }
    }
}
