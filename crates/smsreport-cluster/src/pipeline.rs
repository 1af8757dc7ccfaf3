//! Cluster pipeline execution.

use std::collections::BTreeSet;

use smsreport_core::filter::passes;
use smsreport_core::{ClusterConfig, MessageFilter, Result};
use tracing::{debug, info};

use crate::aggregate::{aggregate, aggregate_overall};
use crate::cluster::Clusterer;
use crate::normalize::normalize;
use crate::template::{collect_samples, synthesize};
use crate::types::*;

/// Normalize → filter → cluster → summarize.
pub struct ClusterPipeline;

impl ClusterPipeline {
    /// Run the full pipeline over the batches, in order.
    pub fn run(
        batches: &[SourceBatch],
        filter: Option<&MessageFilter>,
        config: &ClusterConfig,
    ) -> Result<ClusterReport> {
        let start = std::time::Instant::now();
        let mut clusterer = Clusterer::new(config)?;
        let mut report = ClusterReport {
            threshold: config.threshold,
            ..Default::default()
        };

        info!(
            "Starting cluster pipeline (threshold: {}, batches: {})",
            config.threshold,
            batches.len()
        );
        if let Some(f) = filter {
            info!("Content filter active ({})", f.mode());
        }

        for batch in batches {
            let mut accepted = 0;
            for row in &batch.rows {
                report.input_rows += 1;
                let Some(message) = normalize(row, &batch.source_id) else {
                    report.dropped += 1;
                    continue;
                };
                if !passes(filter, &message.raw_body) {
                    report.filtered_out += 1;
                    continue;
                }
                clusterer.push(message);
                accepted += 1;
            }
            debug!(
                "Batch {}: {} rows, {} accepted",
                batch.source_id,
                batch.rows.len(),
                accepted
            );
        }

        let clusters = clusterer.finish();
        report.overall = aggregate_overall(&clusters);
        report.clusters = clusters
            .iter()
            .map(|c| Self::summarize(c, config))
            .collect();
        report.sources = batches
            .iter()
            .map(|b| b.source_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Cluster pipeline complete: rows={}, clustered={}, clusters={}, dropped={}, filtered={}, duration={}ms",
            report.input_rows,
            report.overall.total,
            report.overall.total_clusters,
            report.dropped,
            report.filtered_out,
            report.duration_ms
        );

        Ok(report)
    }

    fn summarize(cluster: &Cluster, config: &ClusterConfig) -> ClusterSummary {
        ClusterSummary {
            template: synthesize(cluster, config.max_placeholder_ratio),
            representative: cluster.representative_raw.clone(),
            samples: collect_samples(cluster, config.sample_limit),
            stats: aggregate(cluster),
            sources: cluster.sources().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreport_core::{CellValue, RawRow};

    fn row(body: &str, status: &str, date: &str) -> RawRow {
        let mut r = RawRow::new();
        r.insert("body".into(), CellValue::Text(body.into()));
        r.insert("status".into(), CellValue::Text(status.into()));
        r.insert("date_sent".into(), CellValue::Text(date.into()));
        r
    }

    fn batch(id: &str, rows: Vec<RawRow>) -> SourceBatch {
        SourceBatch {
            source_id: id.into(),
            rows,
        }
    }

    #[test]
    fn test_pipeline_counts_add_up() {
        let batches = vec![
            batch(
                "0709.csv",
                vec![
                    row("Buy now: http://x.co/a1", "delivered", "2025-09-07 10:00:00"),
                    row("Buy now: http://x.co/b2", "failed", "2025-09-07 11:00:00"),
                    row("", "delivered", "2025-09-07 11:00:00"),
                ],
            ),
            batch(
                "0809.csv",
                vec![
                    row("Buy now: http://x.co/c3", "Delivered", "2025-09-08 09:00:00"),
                    row("Your code is 1234", "queued", "bad date"),
                ],
            ),
        ];
        let report = ClusterPipeline::run(&batches, None, &ClusterConfig::default()).unwrap();

        assert_eq!(report.input_rows, 5);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.overall.total + report.dropped, report.input_rows);
        assert_eq!(report.overall.total_clusters, 2);
        assert_eq!(report.sources, vec!["0709.csv", "0809.csv"]);

        let top = &report.clusters[0];
        assert_eq!(top.stats.total, 3);
        assert_eq!(top.stats.by_status.delivered, 2);
        assert_eq!(top.template, "Buy now: {variable}");
        assert_eq!(top.sources, vec!["0709.csv", "0809.csv"]);
        assert_eq!(top.stats.by_date.len(), 2);

        let code = &report.clusters[1];
        assert!(code.stats.by_date.is_empty());
        assert_eq!(code.template, "Your code is 1234");
    }

    #[test]
    fn test_pipeline_filter() {
        let batches = vec![batch(
            "a",
            vec![
                row("Promo hoje", "delivered", ""),
                row("Outra coisa", "delivered", ""),
            ],
        )];
        let filter = MessageFilter::prepare("promo", false).unwrap();
        let report =
            ClusterPipeline::run(&batches, filter.as_ref(), &ClusterConfig::default()).unwrap();
        assert_eq!(report.filtered_out, 1);
        assert_eq!(report.overall.total, 1);
        assert_eq!(
            report.overall.total + report.dropped + report.filtered_out,
            report.input_rows
        );
    }

    #[test]
    fn test_pipeline_rejects_bad_threshold() {
        let err = ClusterPipeline::run(&[], None, &ClusterConfig::with_threshold(2.0)).unwrap_err();
        assert!(matches!(err, smsreport_core::Error::Config(_)));
    }

    #[test]
    fn test_empty_body_does_not_create_cluster() {
        let batches = vec![batch("a", vec![row("   ", "delivered", "")])];
        let report = ClusterPipeline::run(&batches, None, &ClusterConfig::default()).unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.overall.total_clusters, 0);
        assert!(report.clusters.is_empty());
    }
}
