//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// Default similarity threshold for grouping message bodies.
pub const DEFAULT_THRESHOLD: f64 = 0.70;
/// Characters of the normalized body used as the prefix-bucket key.
pub const DEFAULT_PREFIX_LEN: usize = 40;
/// Length-ratio rejection slack below the threshold.
pub const DEFAULT_LENGTH_RATIO_SLACK: f64 = 0.15;
/// Placeholder share at which a template is discarded.
pub const DEFAULT_MAX_PLACEHOLDER_RATIO: f64 = 0.60;
/// Sample bodies kept per cluster.
pub const DEFAULT_SAMPLE_LIMIT: usize = 3;

/// Clustering parameters. Passed explicitly into every entry point.
///
/// `prefix_len`, `length_ratio_slack` and `max_placeholder_ratio` are tuning
/// heuristics; only `threshold` defines the accept/reject decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Minimum similarity ratio, in `(0, 1]`.
    pub threshold: f64,
    pub prefix_len: usize,
    pub length_ratio_slack: f64,
    pub max_placeholder_ratio: f64,
    pub sample_limit: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            prefix_len: DEFAULT_PREFIX_LEN,
            length_ratio_slack: DEFAULT_LENGTH_RATIO_SLACK,
            max_placeholder_ratio: DEFAULT_MAX_PLACEHOLDER_RATIO,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl ClusterConfig {
    /// Default heuristics with the given threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    /// Reject out-of-range values before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::Config(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if !(self.max_placeholder_ratio > 0.0 && self.max_placeholder_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "max_placeholder_ratio must be in (0, 1], got {}",
                self.max_placeholder_ratio
            )));
        }
        if !self.length_ratio_slack.is_finite() || self.length_ratio_slack < 0.0 {
            return Err(Error::Config(format!(
                "length_ratio_slack must be a non-negative number, got {}",
                self.length_ratio_slack
            )));
        }
        Ok(())
    }
}

/// Per-run options for a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Body filter text; empty means no filter.
    pub filter: String,
    /// Treat `filter` as a regex.
    pub use_regex: bool,
    /// Report title shown above the overview.
    pub title: Option<String>,
    /// Subtitle, e.g. a campaign flow id.
    pub subtitle: Option<String>,
    /// Reference campaign text shown in the overview.
    pub campaign_text: Option<String>,
}

/// Paths to all smsreport data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Uploaded input files (`data/uploads/`).
    pub uploads: PathBuf,
    /// Rendered reports (`data/reports/`).
    pub reports: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            uploads: root.join("uploads"),
            reports: root.join("reports"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.uploads)?;
        std::fs::create_dir_all(&self.reports)?;
        Ok(())
    }
}

/// Provider credentials for the remote fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub account_sid: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Clustering defaults.
    pub cluster: ClusterConfig,
    /// Provider credentials, when configured.
    pub credentials: Option<ProviderCredentials>,
    /// Offset of the campaign's local time zone, in hours.
    pub utc_offset_hours: i32,
}

impl AppConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3003);

        let threshold = match std::env::var("SMSREPORT_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Config(format!("SMSREPORT_THRESHOLD is not a number: {}", raw)))?,
            Err(_) => DEFAULT_THRESHOLD,
        };
        let cluster = ClusterConfig::with_threshold(threshold);
        cluster.validate()?;

        let utc_offset_hours = std::env::var("SMSREPORT_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(-3);

        let credentials = match (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
        ) {
            (Ok(account_sid), Ok(auth_token))
                if !account_sid.is_empty() && !auth_token.is_empty() =>
            {
                Some(ProviderCredentials {
                    account_sid,
                    auth_token,
                })
            }
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                warn!("Only one of TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN is set; remote fetch disabled");
                None
            }
            _ => None,
        };

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            cluster,
            credentials,
            utc_offset_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_valid() {
        let cfg = ClusterConfig::default();
        assert_eq!(cfg.threshold, 0.70);
        assert_eq!(cfg.prefix_len, 40);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(ClusterConfig::with_threshold(1.0).validate().is_ok());
        assert!(ClusterConfig::with_threshold(0.01).validate().is_ok());
        for bad in [0.0, -0.2, 1.01, f64::NAN] {
            let err = ClusterConfig::with_threshold(bad).validate().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "threshold {} accepted", bad);
        }
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let cfg: ClusterConfig = serde_json::from_str(r#"{"threshold": 0.9}"#).unwrap();
        assert_eq!(cfg.threshold, 0.9);
        assert_eq!(cfg.sample_limit, 3);
    }

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        assert!(paths.uploads.is_dir());
        assert!(paths.reports.is_dir());
    }
}
