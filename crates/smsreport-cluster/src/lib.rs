//! Message-similarity clustering.
//!
//! Normalizes raw rows into messages, groups near-duplicate bodies that
//! differ only in tracking links or personalization, synthesizes a template
//! per group, and counts messages per status and date.

pub mod aggregate;
pub mod cluster;
pub mod normalize;
pub mod pipeline;
pub mod similarity;
pub mod template;
pub mod types;

pub use aggregate::{aggregate, aggregate_overall};
pub use cluster::{cluster_messages, Clusterer};
pub use normalize::{normalize, normalize_body};
pub use pipeline::ClusterPipeline;
pub use template::{collect_samples, synthesize, PLACEHOLDER};
pub use types::*;
