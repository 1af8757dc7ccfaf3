//! Plain-text console report.

use std::fmt::Write;

use smsreport_cluster::{ClusterReport, ClusterSummary, StatusBreakdown};
use smsreport_core::RunConfig;

use crate::title::title_from_filename;

/// Wrap width for message text.
pub const REPORT_WIDTH: usize = 96;
const RULE_WIDTH: usize = 100;

/// Integer with `.` as the thousands separator.
pub fn format_int(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Collapse whitespace and wrap greedily at `width`; words longer than the
/// width are split. The first line gets `first_indent`, the rest `indent`.
pub fn wrap_block(text: &str, width: usize, first_indent: &str, indent: &str) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(width) {
            let piece: String = piece.iter().collect();
            let current_len = current.chars().count();
            if current.is_empty() {
                current = piece;
            } else if current_len + 1 + piece.chars().count() <= width {
                current.push(' ');
                current.push_str(&piece);
            } else {
                lines.push(std::mem::replace(&mut current, piece));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}{}", if i == 0 { first_indent } else { indent }, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn percent(threshold: f64) -> String {
    format!("{:.0}%", threshold * 100.0)
}

/// One line per raw status, largest first, with its share of the total.
fn write_breakdown(out: &mut String, breakdown: &StatusBreakdown, indent: &str) -> std::fmt::Result {
    let total = breakdown.total().max(1) as f64;
    for (status, count) in breakdown.most_common() {
        writeln!(
            out,
            "{}- {:<15}: {} ({:.1}%)",
            indent,
            status,
            format_int(count),
            count as f64 * 100.0 / total
        )?;
    }
    Ok(())
}

fn write_overview(out: &mut String, report: &ClusterReport, run: &RunConfig) -> std::fmt::Result {
    let overall = &report.overall;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    match &run.title {
        Some(title) => writeln!(out, "{} - similarity >= {}", title, percent(report.threshold))?,
        None => writeln!(out, "Consolidated report - similarity >= {}", percent(report.threshold))?,
    }
    if let Some(subtitle) = &run.subtitle {
        writeln!(out, "{}", subtitle)?;
    }
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "Total messages : {}", format_int(overall.total))?;
    writeln!(out, "Clusters       : {}", format_int(overall.total_clusters))?;
    writeln!(out, "Delivered      : {}", format_int(overall.by_status.delivered))?;
    writeln!(out, "Not delivered  : {}", format_int(overall.by_status.other))?;
    if report.dropped > 0 || report.filtered_out > 0 {
        writeln!(
            out,
            "Skipped        : {} without body, {} filtered out",
            format_int(report.dropped),
            format_int(report.filtered_out)
        )?;
    }
    if !run.filter.is_empty() {
        let mode = if run.use_regex { "regex" } else { "text" };
        writeln!(out, "Filter ({})   : {}", mode, run.filter)?;
    }

    if !overall.by_raw_status.is_empty() {
        writeln!(out, "\nStatus breakdown:")?;
        write_breakdown(out, &overall.by_raw_status, "  ")?;
    }

    if let Some(campaign) = &run.campaign_text {
        writeln!(out, "\nCampaign message:")?;
        writeln!(out, "{}", wrap_block(campaign, REPORT_WIDTH, "    ", "    "))?;
    }

    if overall.by_date.is_empty() {
        writeln!(out, "\nDates with messages: not available.")?;
    } else {
        writeln!(out, "\nDates with messages:")?;
        for (date, counts) in &overall.by_date {
            writeln!(out, "  - {}: {}", date, format_int(counts.total()))?;
        }
    }

    if !report.sources.is_empty() {
        writeln!(out, "\nFiles analyzed:")?;
        for name in &report.sources {
            let title = title_from_filename(name);
            if title == name.as_str() {
                writeln!(out, "  - {}", name)?;
            } else {
                writeln!(out, "  - {} ({})", name, title)?;
            }
        }
    }

    if overall.by_source.len() > 1 {
        writeln!(out, "\nStatus by file:")?;
        for (name, breakdown) in &overall.by_source {
            writeln!(out, "  {} ({} messages)", name, format_int(breakdown.total()))?;
            write_breakdown(out, breakdown, "    ")?;
        }
    }
    writeln!(out)
}

fn write_cluster(out: &mut String, idx: usize, cluster: &ClusterSummary) -> std::fmt::Result {
    let stats = &cluster.stats;
    writeln!(
        out,
        "[{}] Total: {} | Delivered: {} | Not delivered: {}",
        idx,
        format_int(stats.total),
        format_int(stats.by_status.delivered),
        format_int(stats.by_status.other)
    )?;

    writeln!(out, "  Template:")?;
    writeln!(out, "{}", wrap_block(&cluster.template, REPORT_WIDTH, "    ", "    "))?;

    if !cluster.samples.is_empty() {
        writeln!(out, "  Sample messages:")?;
        for sample in &cluster.samples {
            writeln!(out, "{}", wrap_block(sample, REPORT_WIDTH, "    - ", "      "))?;
        }
    }

    if stats.by_date.is_empty() {
        writeln!(out, "  Dates: not available.")?;
    } else {
        writeln!(out, "  Dates:")?;
        for (date, counts) in &stats.by_date {
            writeln!(
                out,
                "    - {}: {} (Delivered: {}, Not delivered: {})",
                date,
                format_int(counts.total()),
                format_int(counts.delivered),
                format_int(counts.other)
            )?;
        }
    }

    if !cluster.sources.is_empty() {
        writeln!(out, "  Source files:")?;
        for name in &cluster.sources {
            writeln!(out, "    - {}", name)?;
        }
    }
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

/// Render the overview followed by one block per cluster.
pub fn render_text(report: &ClusterReport, run: &RunConfig) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_overview(&mut out, report, run);
    let _ = writeln!(out, "Clusters in detail");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    for (idx, cluster) in report.clusters.iter().enumerate() {
        let _ = write_cluster(&mut out, idx + 1, cluster);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsreport_cluster::{ClusterPipeline, SourceBatch};
    use smsreport_core::{CellValue, ClusterConfig, RawRow};

    #[test]
    fn test_format_int() {
        assert_eq!(format_int(0), "0");
        assert_eq!(format_int(999), "999");
        assert_eq!(format_int(1000), "1.000");
        assert_eq!(format_int(1234567), "1.234.567");
    }

    #[test]
    fn test_wrap_block() {
        let text = "one  two\nthree four";
        assert_eq!(wrap_block(text, 9, "> ", "  "), "> one two\n  three\n  four");
        assert_eq!(wrap_block("abcdefgh", 3, "", ""), "abc\ndef\ngh");
        assert_eq!(wrap_block("   ", 10, "x", "y"), "");
    }

    fn row(body: &str, status: &str, date: &str) -> RawRow {
        let mut r = RawRow::new();
        r.insert("body".into(), CellValue::Text(body.into()));
        r.insert("status".into(), CellValue::Text(status.into()));
        r.insert("date_sent".into(), CellValue::Text(date.into()));
        r
    }

    #[test]
    fn test_render_text() {
        let batches = vec![SourceBatch {
            source_id: "0709.csv".into(),
            rows: vec![
                row("Oferta: http://x.co/a1", "delivered", "2025-09-07 10:00:00"),
                row("Oferta: http://x.co/b2", "failed", "2025-09-07 11:00:00"),
                row("Seu codigo e 1234", "delivered", ""),
            ],
        }];
        let report = ClusterPipeline::run(&batches, None, &ClusterConfig::default()).unwrap();
        let run = RunConfig {
            filter: "oferta".into(),
            ..Default::default()
        };
        let text = render_text(&report, &run);

        assert!(text.contains("Consolidated report - similarity >= 70%"));
        assert!(text.contains("Total messages : 3"));
        assert!(text.contains("Clusters       : 2"));
        assert!(text.contains("Filter (text)   : oferta"));
        assert!(text.contains("  - 2025-09-07: 2"));
        assert!(text.contains("  - 0709.csv (07/09)"));
        assert!(text.contains("[1] Total: 2 | Delivered: 1 | Not delivered: 1"));
        assert!(text.contains("    Oferta: {variable}"));
        assert!(text.contains("    - 2025-09-07: 2 (Delivered: 1, Not delivered: 1)"));
        assert!(text.contains("[2] Total: 1 | Delivered: 1 | Not delivered: 0"));
        assert!(text.contains("  Dates: not available."));
    }

    #[test]
    fn test_render_status_breakdown() {
        let batches = vec![
            SourceBatch {
                source_id: "0709.csv".into(),
                rows: vec![
                    row("Oferta: http://x.co/a1", "delivered", "2025-09-07"),
                    row("Oferta: http://x.co/b2", "undelivered", "2025-09-07"),
                    row("Oferta: http://x.co/c3", "delivered", "2025-09-07"),
                ],
            },
            SourceBatch {
                source_id: "0809.csv".into(),
                rows: vec![
                    row("Oferta: http://x.co/d4", "failed", "2025-09-08"),
                    row("Oferta: http://x.co/e5", "queued", "2025-09-08"),
                    row("Oferta: http://x.co/f6", "", "2025-09-08"),
                ],
            },
        ];
        let report = ClusterPipeline::run(&batches, None, &ClusterConfig::default()).unwrap();
        let text = render_text(&report, &RunConfig::default());

        assert!(text.contains("Status breakdown:\n  - delivered      : 2 (33.3%)\n"));
        assert!(text.contains("  - undelivered    : 1 (16.7%)"));
        assert!(text.contains("  - no_status      : 1 (16.7%)"));
        assert!(text.contains("Status by file:\n  0709.csv (3 messages)\n    - delivered      : 2 (66.7%)\n    - undelivered    : 1 (33.3%)\n"));
        assert!(text.contains("  0809.csv (3 messages)\n    - failed         : 1 (33.3%)"));
    }
}
