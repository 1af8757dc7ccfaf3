//! Message sources.

use std::future::Future;

use smsreport_core::Result;

use crate::types::{DateBlock, FetchedMessage};

/// Something that can list the messages sent within a block of days.
///
/// Implementations must be shareable across tasks; one call per block is
/// made concurrently.
pub trait MessageSource: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn fetch_block(
        &self,
        block: &DateBlock,
    ) -> impl Future<Output = Result<Vec<FetchedMessage>>> + Send;
}
