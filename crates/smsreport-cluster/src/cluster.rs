//! Single-pass greedy similarity clustering.

use std::collections::{HashMap, HashSet};

use smsreport_core::{ClusterConfig, Result};
use tracing::debug;

use crate::similarity::is_similar;
use crate::types::{Cluster, Message};

/// Incremental clusterer. Feed messages in order, then [`Clusterer::finish`].
pub struct Clusterer {
    threshold: f64,
    prefix_len: usize,
    length_ratio_slack: f64,
    clusters: Vec<Cluster>,
    /// Character length of each cluster's representative.
    rep_lens: Vec<usize>,
    exact_index: HashMap<String, usize>,
    prefix_index: HashMap<String, Vec<usize>>,
    no_body: Option<usize>,
}

impl Clusterer {
    /// Validates the configuration up front.
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            threshold: config.threshold,
            prefix_len: config.prefix_len,
            length_ratio_slack: config.length_ratio_slack,
            clusters: Vec::new(),
            rep_lens: Vec::new(),
            exact_index: HashMap::new(),
            prefix_index: HashMap::new(),
            no_body: None,
        })
    }

    fn prefix_of(&self, normalized: &str) -> String {
        normalized.chars().take(self.prefix_len).collect()
    }

    fn create(&mut self, message: &Message) -> usize {
        self.clusters.push(Cluster::seeded_by(message));
        self.rep_lens.push(message.normalized_body.chars().count());
        self.clusters.len() - 1
    }

    /// Rejection on length alone. Never accepts, but may reject pairs the
    /// full ratio would accept.
    fn length_mismatch(&self, len: usize, idx: usize) -> bool {
        let rep_len = self.rep_lens[idx];
        let (lo, hi) = if len < rep_len { (len, rep_len) } else { (rep_len, len) };
        hi > 0 && (lo as f64 / hi as f64) < self.threshold - self.length_ratio_slack
    }

    fn find_match(&self, normalized: &str, prefix: &str) -> Option<usize> {
        if let Some(&idx) = self.exact_index.get(normalized) {
            return Some(idx);
        }

        let candidates = self.prefix_index.get(prefix).map(Vec::as_slice).unwrap_or(&[]);
        for &idx in candidates {
            if is_similar(normalized, &self.clusters[idx].representative_normalized, self.threshold) {
                return Some(idx);
            }
        }

        let tested: HashSet<usize> = candidates.iter().copied().collect();
        let len = normalized.chars().count();
        for (idx, cluster) in self.clusters.iter().enumerate() {
            if tested.contains(&idx) || cluster.is_no_body() {
                continue;
            }
            if self.length_mismatch(len, idx) {
                continue;
            }
            if is_similar(normalized, &cluster.representative_normalized, self.threshold) {
                return Some(idx);
            }
        }
        None
    }

    /// Assign one message, returning the index of its cluster (creation order).
    pub fn push(&mut self, message: Message) -> usize {
        if message.normalized_body.is_empty() {
            let idx = match self.no_body {
                Some(idx) => idx,
                None => {
                    let idx = self.create(&message);
                    self.no_body = Some(idx);
                    idx
                }
            };
            self.clusters[idx].members.push(message);
            return idx;
        }

        let prefix = self.prefix_of(&message.normalized_body);
        let idx = match self.find_match(&message.normalized_body, &prefix) {
            Some(idx) => idx,
            None => self.create(&message),
        };

        if !self.exact_index.contains_key(&message.normalized_body) {
            self.exact_index.insert(message.normalized_body.clone(), idx);
        }
        let bucket = self.prefix_index.entry(prefix).or_default();
        if !bucket.contains(&idx) {
            bucket.push(idx);
        }

        self.clusters[idx].members.push(message);
        idx
    }

    /// Clusters ordered by descending size; ties keep creation order.
    pub fn finish(self) -> Vec<Cluster> {
        let mut clusters = self.clusters;
        clusters.sort_by(|a, b| b.total().cmp(&a.total()));
        debug!("Clustering produced {} clusters", clusters.len());
        clusters
    }
}

/// Cluster a message sequence in order.
pub fn cluster_messages(
    messages: impl IntoIterator<Item = Message>,
    config: &ClusterConfig,
) -> Result<Vec<Cluster>> {
    let mut clusterer = Clusterer::new(config)?;
    for message in messages {
        clusterer.push(message);
    }
    Ok(clusterer.finish())
}
