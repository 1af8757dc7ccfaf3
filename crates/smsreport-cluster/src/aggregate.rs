//! Per-cluster and overall counts.

use crate::types::{Cluster, ClusterStats, OverallStats};

/// Count one cluster. Undated members count toward `total` and
/// `by_status` only.
pub fn aggregate(cluster: &Cluster) -> ClusterStats {
    let mut stats = ClusterStats::default();
    for message in &cluster.members {
        stats.total += 1;
        stats.by_status.add(message.status_class);
        if let Some(date) = message.date {
            stats.by_date.entry(date).or_default().add(message.status_class);
        }
    }
    stats
}

/// Roll all clusters up into one summary.
pub fn aggregate_overall(clusters: &[Cluster]) -> OverallStats {
    let mut overall = OverallStats {
        total_clusters: clusters.len(),
        ..Default::default()
    };
    for cluster in clusters {
        let stats = aggregate(cluster);
        overall.total += stats.total;
        overall.by_status.delivered += stats.by_status.delivered;
        overall.by_status.other += stats.by_status.other;
        for (date, counts) in stats.by_date {
            let entry = overall.by_date.entry(date).or_default();
            entry.delivered += counts.delivered;
            entry.other += counts.other;
            overall.dates.insert(date);
        }
        for message in &cluster.members {
            overall.by_raw_status.add(&message.status_raw);
            overall
                .by_source
                .entry(message.source_id.clone())
                .or_default()
                .add(&message.status_raw);
        }
    }
    overall
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::map_status;
    use crate::types::{Message, StatusCounts};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn message(status: &str, date: Option<NaiveDate>) -> Message {
        from_source("s", status, date)
    }

    fn from_source(source: &str, status: &str, date: Option<NaiveDate>) -> Message {
        Message {
            source_id: source.into(),
            raw_body: "x".into(),
            normalized_body: "x".into(),
            status_raw: status.into(),
            status_class: map_status(status),
            date,
            metadata: BTreeMap::new(),
        }
    }

    fn cluster(members: Vec<Message>) -> Cluster {
        Cluster {
            representative_normalized: "x".into(),
            representative_raw: "x".into(),
            members,
        }
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 9, d)
    }

    #[test]
    fn test_status_collapse() {
        let c = cluster(
            ["delivered", "Delivered", "DELIVERED", "failed", "queued"]
                .iter()
                .map(|s| message(s, None))
                .collect(),
        );
        let stats = aggregate(&c);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_status, StatusCounts { delivered: 3, other: 2 });
        assert!(stats.by_date.is_empty());
    }

    #[test]
    fn test_by_date_skips_undated() {
        let c = cluster(vec![
            message("delivered", day(7)),
            message("failed", day(7)),
            message("delivered", day(8)),
            message("delivered", None),
        ]);
        let stats = aggregate(&c);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status.delivered, 3);
        assert_eq!(stats.by_date.len(), 2);
        assert_eq!(stats.by_date[&day(7).unwrap()], StatusCounts { delivered: 1, other: 1 });
        let dated: usize = stats.by_date.values().map(StatusCounts::total).sum();
        assert_eq!(dated, 3);
    }

    #[test]
    fn test_empty_cluster_is_zero() {
        assert_eq!(aggregate(&cluster(vec![])), ClusterStats::default());
    }

    #[test]
    fn test_overall_rollup() {
        let clusters = vec![
            cluster(vec![message("delivered", day(7)), message("sent", day(8))]),
            cluster(vec![message("delivered", day(8)), message("undelivered", None)]),
        ];
        let overall = aggregate_overall(&clusters);
        assert_eq!(overall.total, 4);
        assert_eq!(overall.total_clusters, 2);
        assert_eq!(overall.by_status, StatusCounts { delivered: 2, other: 2 });
        assert_eq!(overall.by_date[&day(8).unwrap()], StatusCounts { delivered: 1, other: 1 });
        assert_eq!(overall.dates.len(), 2);
    }

    #[test]
    fn test_raw_status_breakdown_overall_and_per_source() {
        let clusters = vec![
            cluster(vec![
                from_source("0709.csv", "delivered", day(7)),
                from_source("0709.csv", "undelivered", day(7)),
                from_source("0709.csv", "Failed ", day(7)),
                from_source("0809.csv", "delivered", day(8)),
            ]),
            cluster(vec![
                from_source("0809.csv", "sent", day(8)),
                from_source("0809.csv", "queued", None),
                from_source("0809.csv", "", None),
                from_source("0709.csv", "DELIVERED", None),
            ]),
        ];
        let overall = aggregate_overall(&clusters);

        assert_eq!(overall.by_raw_status.total(), overall.total);
        assert_eq!(overall.by_raw_status.get("delivered"), 3);
        assert_eq!(overall.by_raw_status.get("failed"), 1);
        assert_eq!(overall.by_raw_status.get(crate::types::NO_STATUS), 1);
        // The binary collapse agrees with the raw breakdown.
        assert_eq!(overall.by_status.delivered, overall.by_raw_status.get("delivered"));
        assert_eq!(overall.by_raw_status.most_common()[0], ("delivered", 3));

        let first = &overall.by_source["0709.csv"];
        assert_eq!(first.total(), 4);
        assert_eq!(first.get("delivered"), 2);
        assert_eq!(first.get("undelivered"), 1);
        let second = &overall.by_source["0809.csv"];
        assert_eq!(second.total(), 4);
        assert_eq!(second.get("queued"), 1);
        assert_eq!(second.get("sent"), 1);
    }
}
