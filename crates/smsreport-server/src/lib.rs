//! smsreport: cluster SMS campaign logs into templates with delivery
//! statistics, from the command line or over HTTP.

pub mod commands;
pub mod reporting;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
