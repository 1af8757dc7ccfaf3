//! Report and export runs shared by the CLI and the HTTP API.

use chrono::FixedOffset;
use smsreport_cluster::{ClusterPipeline, ClusterReport, SourceBatch};
use smsreport_core::{ClusterConfig, MessageFilter, Result, RunConfig};
use smsreport_fetch::{FetchReport, EXPORT_COLUMNS};
use smsreport_ingest::Table;
use smsreport_report::{render_text, ReportDocument};

pub struct ReportOutput {
    pub report: ClusterReport,
    pub text: String,
    pub document: ReportDocument,
}

impl ReportOutput {
    pub fn has_messages(&self) -> bool {
        self.report.overall.total > 0
    }
}

pub fn table_batch(source_id: impl Into<String>, table: Table) -> SourceBatch {
    SourceBatch {
        source_id: source_id.into(),
        rows: table.rows,
    }
}

/// Fetched messages as an export table, timestamps in `offset`.
pub fn export_table(fetched: &FetchReport, offset: FixedOffset) -> Table {
    let mut table = Table::default();
    for column in EXPORT_COLUMNS {
        table.add_column(column);
    }
    for message in &fetched.messages {
        table.push_row(message.to_row(offset));
    }
    table
}

/// Filter, cluster and render the batches.
pub fn run_report(batches: &[SourceBatch], cluster: &ClusterConfig, run: &RunConfig) -> Result<ReportOutput> {
    let filter = MessageFilter::prepare(&run.filter, run.use_regex)?;
    let report = ClusterPipeline::run(batches, filter.as_ref(), cluster)?;
    let text = render_text(&report, run);
    let document = ReportDocument::from_report(&report);
    Ok(ReportOutput {
        report,
        text,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreport_ingest::read_table_from_str;

    #[test]
    fn test_run_report_from_csv() {
        let table = read_table_from_str(
            "body;status;date_sent\nPromo http://a.co/1;delivered;2025-09-07\nPromo http://a.co/2;failed;2025-09-07\n",
            "0709.csv",
        )
        .unwrap();
        let batches = vec![table_batch("0709.csv", table)];
        let output = run_report(&batches, &ClusterConfig::default(), &RunConfig::default()).unwrap();
        assert!(output.has_messages());
        assert_eq!(output.report.overall.total_clusters, 1);
        assert!(output.text.contains("[1] Total: 2"));
    }

    #[test]
    fn test_run_report_from_spreadsheet_serial_dates() {
        let bytes = include_bytes!("../../smsreport-ingest/tests/fixtures/campaign.xlsx");
        let table = smsreport_ingest::read_table_from_bytes(bytes, "campaign.xlsx").unwrap();
        let batches = vec![table_batch("campaign.xlsx", table)];
        let output = run_report(&batches, &ClusterConfig::default(), &RunConfig::default()).unwrap();

        let overall = &output.report.overall;
        assert_eq!(overall.total, 2);
        let dates: Vec<String> = overall.dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(dates, vec!["2025-09-07", "2025-09-08"]);
        assert_eq!(overall.by_raw_status.get("undelivered"), 1);
        assert!(output.text.contains("  - 2025-09-07: 1"));
    }

    #[test]
    fn test_export_table_columns() {
        let fetched = FetchReport {
            messages: vec![smsreport_fetch::FetchedMessage {
                sid: "SM1".into(),
                body: "Oi".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let table = export_table(&fetched, FixedOffset::east_opt(0).unwrap());
        assert_eq!(table.columns, EXPORT_COLUMNS.to_vec());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let run = RunConfig {
            filter: "(".into(),
            use_regex: true,
            ..Default::default()
        };
        let err = run_report(&[], &ClusterConfig::default(), &run).err().unwrap();
        assert!(matches!(err, smsreport_core::Error::Config(_)));
    }
}
