//! Dispatcher
//!
//! Runs one flush cycle: groups the drained calls by block, resolves the
//! aggregator of each group, chunks the group by calldata size, sends one
//! `tryAggregate` per chunk and settles every caller.
//!
//! Groups are independent units of failure: a transport error, a decoding
//! error or a length mismatch rejects every call of its own group and
//! nothing else. Chunks of a group and the groups themselves all run
//! concurrently.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes};
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::abi::{Aggregate, CallOutcome};
use super::chunker::split_by_data_length;
use super::queue::PendingCall;
use super::settings::BatchSettings;
use super::version;
use crate::error::MulticallError;

/// Calls of one flush cycle sharing the same block selector
#[derive(Debug)]
pub struct BlockGroup {
    pub block: BlockNumberOrTag,
    pub calls: Vec<PendingCall>,
}

/// Partition `calls` by block selector, keeping first-seen order of groups
/// and enqueue order within each group.
pub fn group_by_block(calls: Vec<PendingCall>) -> Vec<BlockGroup> {
    let mut groups: Vec<BlockGroup> = Vec::new();

    for call in calls {
        match groups.iter_mut().find(|g| g.block == call.block) {
            Some(group) => group.calls.push(call),
            None => groups.push(BlockGroup {
                block: call.block,
                calls: vec![call],
            }),
        }
    }

    groups
}

pub struct Dispatcher {
    aggregate: Arc<dyn Aggregate>,
    settings: Arc<BatchSettings>,
}

impl Dispatcher {
    pub fn new(aggregate: Arc<dyn Aggregate>, settings: Arc<BatchSettings>) -> Self {
        Self {
            aggregate,
            settings,
        }
    }

    /// Dispatch one drained batch and settle every call in it
    pub async fn dispatch(&self, calls: Vec<PendingCall>) {
        if calls.is_empty() {
            return;
        }

        let start = Instant::now();
        let call_count = calls.len();
        let max_data_length = self.settings.max_data_length();

        let groups = group_by_block(calls);
        let group_count = groups.len();

        join_all(
            groups
                .into_iter()
                .map(|group| self.dispatch_group(group, max_data_length)),
        )
        .await;

        debug!(
            "Flushed {} calls in {} block groups in {:?}",
            call_count,
            group_count,
            start.elapsed()
        );
    }

    async fn dispatch_group(&self, group: BlockGroup, max_data_length: usize) {
        let BlockGroup { block, calls } = group;

        match self.execute_group(block, &calls, max_data_length).await {
            Ok(outcomes) => {
                for (call, outcome) in calls.into_iter().zip(outcomes) {
                    call.settle(Ok(outcome));
                }
            }
            Err(err) => {
                warn!("Multicall at block {} failed for {} calls: {}", block, calls.len(), err);
                for call in calls {
                    call.settle(Err(err.clone()));
                }
            }
        }
    }

    async fn execute_group(
        &self,
        block: BlockNumberOrTag,
        calls: &[PendingCall],
        max_data_length: usize,
    ) -> Result<Vec<CallOutcome>, MulticallError> {
        let chain_id = match calls.first() {
            Some(call) => call.chain_id,
            None => return Ok(Vec::new()),
        };

        let aggregator = version::resolve(chain_id, version::block_number(&block))
            .ok_or(MulticallError::Unavailable { chain_id, block })?;

        let pairs: Vec<(Address, Bytes)> = calls
            .iter()
            .map(|call| (call.target, call.payload.clone()))
            .collect();
        let chunks = split_by_data_length(pairs, max_data_length, |pair: &(Address, Bytes)| pair.1.len());

        trace!(
            "Block {}: {} calls in {} chunks via {} at {}",
            block,
            calls.len(),
            chunks.len(),
            aggregator.version,
            aggregator.address
        );

        let results = try_join_all(chunks.into_iter().map(|chunk| async move {
            let expected = chunk.len();
            let outcomes = self
                .aggregate
                .try_aggregate(&aggregator, chunk, block)
                .await
                .map_err(MulticallError::transport)?;

            if outcomes.len() != expected {
                return Err(MulticallError::LengthMismatch {
                    received: outcomes.len(),
                    expected,
                });
            }

            Ok::<_, MulticallError>(outcomes)
        }))
        .await?;

        Ok(results.into_iter().flatten().collect())
    }
}
