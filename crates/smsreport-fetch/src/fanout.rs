//! Fan-out/fan-in over date blocks.

use std::collections::HashMap;
use std::sync::Arc;

use smsreport_core::filter::passes;
use smsreport_core::MessageFilter;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::source::MessageSource;
use crate::types::{BlockOutcome, DateBlock, FetchReport, FetchedMessage};

struct BlockResult {
    outcome: BlockOutcome,
    messages: Vec<FetchedMessage>,
}

async fn run_block<S: MessageSource>(
    source: Arc<S>,
    block: DateBlock,
    filter: Option<Arc<MessageFilter>>,
) -> BlockResult {
    info!(
        "[Block {}] Fetching {} -> {} from {}",
        block.index,
        block.start,
        block.end,
        source.name()
    );

    match source.fetch_block(&block).await {
        Ok(fetched) => {
            let processed = fetched.len();
            let messages: Vec<_> = fetched
                .into_iter()
                .filter(|m| passes(filter.as_deref(), &m.body))
                .collect();
            info!(
                "[Block {}] Done | processed={} | found={}",
                block.index,
                processed,
                messages.len()
            );
            BlockResult {
                outcome: BlockOutcome {
                    block,
                    processed,
                    found: messages.len(),
                    error: None,
                },
                messages,
            }
        }
        Err(e) => {
            error!("[Block {}] Failed: {}", block.index, e);
            BlockResult {
                outcome: BlockOutcome {
                    block,
                    processed: 0,
                    found: 0,
                    error: Some(e.to_string()),
                },
                messages: Vec::new(),
            }
        }
    }
}

/// Fetch every block concurrently. A failing block is reported in its
/// outcome and does not affect the others.
pub async fn fetch_all<S: MessageSource>(
    source: Arc<S>,
    blocks: Vec<DateBlock>,
    filter: Option<MessageFilter>,
) -> FetchReport {
    let filter = filter.map(Arc::new);
    let mut tasks = JoinSet::new();
    for block in blocks.iter().copied() {
        tasks.spawn(run_block(source.clone(), block, filter.clone()));
    }

    let mut results: Vec<BlockResult> = Vec::with_capacity(blocks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => {
                info!("Result received from block {}", result.outcome.block.index);
                results.push(result);
            }
            Err(e) => warn!("Fetch task aborted: {}", e),
        }
    }

    // A block whose task panicked still gets an outcome.
    for block in &blocks {
        if !results.iter().any(|r| r.outcome.block.index == block.index) {
            results.push(BlockResult {
                outcome: BlockOutcome {
                    block: *block,
                    processed: 0,
                    found: 0,
                    error: Some("task aborted".into()),
                },
                messages: Vec::new(),
            });
        }
    }
    results.sort_by_key(|r| r.outcome.block.index);

    let total_processed = results.iter().map(|r| r.outcome.processed).sum();
    let mut outcomes = Vec::with_capacity(results.len());
    let mut batches = Vec::with_capacity(results.len());
    for result in results {
        outcomes.push(result.outcome);
        batches.push(result.messages);
    }
    let messages = merge(batches);

    let report = FetchReport {
        outcomes,
        messages,
        total_processed,
    };
    info!(
        "Fetch complete: {} messages kept of {} processed, {} failed blocks",
        report.messages.len(),
        report.total_processed,
        report.failed_blocks()
    );
    report
}

/// Deduplicate by sid (later batches win) and sort by timestamp then sid.
pub fn merge(batches: Vec<Vec<FetchedMessage>>) -> Vec<FetchedMessage> {
    let mut by_sid: HashMap<String, FetchedMessage> = HashMap::new();
    for message in batches.into_iter().flatten() {
        by_sid.insert(message.sid.clone(), message);
    }
    let mut merged: Vec<_> = by_sid.into_values().collect();
    merged.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.sid.cmp(&b.sid))
    });
    merged
}
