//! Report rendering for clustered message logs.
//!
//! Turns a [`smsreport_cluster::ClusterReport`] into the plain-text console
//! report or a JSON document. Source files are labelled by the date found in
//! their names.

pub mod json;
pub mod text;
pub mod title;

pub use json::ReportDocument;
pub use text::{format_int, render_text, wrap_block, REPORT_WIDTH};
pub use title::title_from_filename;
