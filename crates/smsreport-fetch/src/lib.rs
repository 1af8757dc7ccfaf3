//! Remote message log fetch.
//!
//! Splits a date range into blocks, fetches each block concurrently from a
//! [`MessageSource`], and merges the results into one ordered list that can
//! be written out as an export or fed straight into the clustering pipeline.

pub mod blocks;
pub mod fanout;
pub mod source;
pub mod twilio;
pub mod types;

pub use blocks::{fixed_offset, split_range};
pub use fanout::{fetch_all, merge};
pub use source::MessageSource;
pub use twilio::TwilioSource;
pub use types::*;
