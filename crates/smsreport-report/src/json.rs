//! JSON report document.

use serde::Serialize;
use smsreport_cluster::{ClusterReport, ClusterStats, OverallStats};

use crate::title::title_from_filename;

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterDocument {
    pub template: String,
    pub samples: Vec<String>,
    pub stats: ClusterStats,
    pub sources: Vec<String>,
}

/// Serializable form of a clustering run, as returned by the HTTP API and
/// `report --json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub threshold: f64,
    pub input_rows: usize,
    pub dropped: usize,
    pub filtered_out: usize,
    pub files: Vec<SourceFile>,
    pub overall: OverallStats,
    pub clusters: Vec<ClusterDocument>,
    pub duration_ms: u64,
}

impl ReportDocument {
    pub fn from_report(report: &ClusterReport) -> Self {
        Self {
            threshold: report.threshold,
            input_rows: report.input_rows,
            dropped: report.dropped,
            filtered_out: report.filtered_out,
            files: report
                .sources
                .iter()
                .map(|name| SourceFile {
                    name: name.clone(),
                    title: title_from_filename(name),
                })
                .collect(),
            overall: report.overall.clone(),
            clusters: report
                .clusters
                .iter()
                .map(|c| ClusterDocument {
                    template: c.template.clone(),
                    samples: c.samples.clone(),
                    stats: c.stats.clone(),
                    sources: c.sources.clone(),
                })
                .collect(),
            duration_ms: report.duration_ms,
        }
    }

    pub fn to_json_pretty(&self) -> smsreport_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreport_cluster::{ClusterPipeline, SourceBatch};
    use smsreport_core::{CellValue, ClusterConfig, RawRow};

    #[test]
    fn test_document_shape() {
        let mut row = RawRow::new();
        row.insert("mensagem".into(), CellValue::Text("Oi Ana".into()));
        row.insert("status".into(), CellValue::Text("delivered".into()));
        row.insert("data_envio".into(), CellValue::Text("2025-09-07".into()));
        let batches = vec![SourceBatch {
            source_id: "2025-09-07.json".into(),
            rows: vec![row],
        }];
        let report = ClusterPipeline::run(&batches, None, &ClusterConfig::default()).unwrap();
        let doc = ReportDocument::from_report(&report);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["threshold"], 0.7);
        assert_eq!(value["inputRows"], 1);
        assert_eq!(value["files"][0]["title"], "07/09/2025");
        assert_eq!(value["overall"]["totalClusters"], 1);
        assert_eq!(value["overall"]["byStatus"]["DELIVERED"], 1);
        assert_eq!(value["overall"]["byRawStatus"]["delivered"], 1);
        assert_eq!(value["overall"]["bySource"]["2025-09-07.json"]["delivered"], 1);
        assert_eq!(value["clusters"][0]["template"], "Oi Ana");
        assert_eq!(value["clusters"][0]["stats"]["byDate"]["2025-09-07"]["DELIVERED"], 1);
        assert!(doc.to_json_pretty().unwrap().contains("\"filteredOut\": 0"));
    }
}
