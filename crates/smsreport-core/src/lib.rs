//! smsreport core: shared row model, errors, configuration and filters.

pub mod config;
pub mod error;
pub mod filter;
pub mod row;

pub use config::{AppConfig, ClusterConfig, DataPaths, ProviderCredentials, RunConfig};
pub use error::{Error, Result};
pub use filter::MessageFilter;
pub use row::{normalize_header, row_from_json, CellValue, RawRow};
