//! Errors surfaced to batched callers
//!
//! A failing aggregated call has to be reported to every caller of its
//! block group, so the error is `Clone` and carries the transport failure
//! behind an `Arc`.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MulticallError {
    /// The aggregator answered with a different number of results than calls sent
    #[error("Unexpected multicall response length: received {received}; expected {expected}")]
    LengthMismatch { received: usize, expected: usize },

    /// The aggregated call itself failed (network, revert of the whole call, decoding)
    #[error("Multicall failed: {0}")]
    Transport(Arc<eyre::Report>),

    /// No aggregator is deployed for this chain at this block
    #[error("No multicall available on chain {chain_id} at block {block}")]
    Unavailable { chain_id: u64, block: BlockNumberOrTag },

    /// The sub-call executed inside the aggregator reported `success = false`
    #[error("Call reverted (return data: {data})")]
    Reverted { data: Bytes },

    /// The batcher stopped before the call was settled
    #[error("Multicall batcher dropped the call before settling it")]
    Dropped,
}

impl MulticallError {
    pub fn transport(report: eyre::Report) -> Self {
        Self::Transport(Arc::new(report))
    }
}

/// Value every pending call is settled with
pub type CallResult = std::result::Result<crate::multicall::CallOutcome, MulticallError>;
