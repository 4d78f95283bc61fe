//! Aggregated call capability
//!
//! Multicall2 and Multicall3 both expose
//! `tryAggregate(bool requireSuccess, (address,bytes)[] calls)`, which runs
//! every call and reports `(success, returnData)` for each one. The batcher
//! always sends `requireSuccess = false` so a failing sub-call cannot take its
//! siblings down with it.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::sync::Arc;
use tracing::trace;

use super::version::Aggregator;
use crate::transport::{CallRequest, CallTransport};

// ============================================
// MULTICALL INTERFACE
// ============================================

sol! {
    /// Shared by Multicall2 and Multicall3 (same selector, same layout)
    interface IMulticall {
        struct Call {
            address target;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function tryAggregate(bool requireSuccess, Call[] calldata calls)
            external returns (Result[] memory returnData);
    }
}

/// Result of one sub-call, exactly as the aggregator reported it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Bytes,
}

impl CallOutcome {
    pub fn success(return_data: impl Into<Bytes>) -> Self {
        Self {
            success: true,
            return_data: return_data.into(),
        }
    }

    pub fn failure(return_data: impl Into<Bytes>) -> Self {
        Self {
            success: false,
            return_data: return_data.into(),
        }
    }
}

// ============================================
// AGGREGATE TRAIT
// ============================================

#[async_trait]
pub trait Aggregate: Send + Sync + 'static {
    /// Execute `calls` through `aggregator` at `block`.
    ///
    /// Implementations return one outcome per call, in order. A length
    /// mismatch is detected by the dispatcher, not here.
    async fn try_aggregate(
        &self,
        aggregator: &Aggregator,
        calls: Vec<(Address, Bytes)>,
        block: BlockNumberOrTag,
    ) -> Result<Vec<CallOutcome>>;
}

/// Encode the `tryAggregate` calldata for `calls`
pub fn encode_try_aggregate(calls: Vec<(Address, Bytes)>) -> Bytes {
    let calls = calls
        .into_iter()
        .map(|(target, call_data)| IMulticall::Call {
            target,
            callData: call_data,
        })
        .collect();

    IMulticall::tryAggregateCall {
        requireSuccess: false,
        calls,
    }
    .abi_encode()
    .into()
}

/// Decode the `tryAggregate` return data
pub fn decode_try_aggregate(data: &[u8]) -> Result<Vec<CallOutcome>> {
    let decoded = IMulticall::tryAggregateCall::abi_decode_returns(data)
        .map_err(|e| eyre!("Failed to decode multicall result: {}", e))?;

    Ok(decoded
        .into_iter()
        .map(|result| CallOutcome {
            success: result.success,
            return_data: result.returnData,
        })
        .collect())
}

/// Default `Aggregate`: ABI-encodes `tryAggregate` and sends it as a plain
/// `eth_call` to the aggregator through the raw transport.
pub struct TryAggregateCodec<T> {
    transport: Arc<T>,
}

impl<T: CallTransport> TryAggregateCodec<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: CallTransport> Aggregate for TryAggregateCodec<T> {
    async fn try_aggregate(
        &self,
        aggregator: &Aggregator,
        calls: Vec<(Address, Bytes)>,
        block: BlockNumberOrTag,
    ) -> Result<Vec<CallOutcome>> {
        trace!(
            "{} tryAggregate with {} calls at {}",
            aggregator.version,
            calls.len(),
            block
        );

        let request = CallRequest::new(aggregator.address, encode_try_aggregate(calls)).at_block(block);
        let output = self.transport.call(request).await?;

        decode_try_aggregate(&output)
    }
}
