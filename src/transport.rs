//! Raw call transport
//!
//! The capability the batcher consumes from the wrapped endpoint and exposes
//! again to its own callers: a single `eth_call`, the chain id, and a generic
//! passthrough for every other JSON-RPC method.

use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_primitives::{Address, Bytes};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportError;
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde_json::Value;
use std::borrow::Cow;

// ============================================
// CALL REQUEST
// ============================================

/// A read-only call as seen by the transport.
///
/// `to` and `input` are optional because not every request that reaches the
/// transport is a plain contract call (contract deployment simulations have no
/// target, some callers send empty calldata).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Option<Address>,
    pub input: Option<Bytes>,
    pub block: BlockNumberOrTag,
}

impl CallRequest {
    /// Call `to` with `input` at the latest block
    pub fn new(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            input: Some(input.into()),
            block: BlockNumberOrTag::Latest,
        }
    }

    pub fn at_block(mut self, block: impl Into<BlockNumberOrTag>) -> Self {
        self.block = block.into();
        self
    }
}

// ============================================
// TRANSPORT TRAIT
// ============================================

#[async_trait]
pub trait CallTransport: Send + Sync + 'static {
    /// Chain id of the network behind this endpoint
    async fn chain_id(&self) -> Result<u64>;

    /// Execute a single `eth_call`
    async fn call(&self, request: CallRequest) -> Result<Bytes>;

    /// Any other JSON-RPC method, sent as-is
    async fn raw_request(&self, method: &str, params: Value) -> Result<Value>;
}

// ============================================
// ALLOY ADAPTER
// ============================================

/// `CallTransport` over any alloy provider
pub struct AlloyTransport<P> {
    provider: P,
}

impl<P: Provider> AlloyTransport<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> CallTransport for AlloyTransport<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| rpc_error("eth_chainId", e))
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes> {
        let mut tx = TransactionRequest::default();
        if let Some(to) = request.to {
            tx = tx.to(to);
        }
        if let Some(input) = request.input {
            tx = tx.input(input.into());
        }

        self.provider
            .call(tx)
            .block(BlockId::Number(request.block))
            .await
            .map_err(|e| rpc_error("eth_call", e))
    }

    async fn raw_request(&self, method: &str, params: Value) -> Result<Value> {
        self.provider
            .raw_request::<Value, Value>(Cow::Owned(method.to_string()), params)
            .await
            .map_err(|e| rpc_error(method, e))
    }
}

fn rpc_error(method: &str, err: TransportError) -> eyre::Report {
    match err.as_error_resp() {
        Some(resp) => eyre!("{} failed: {} (code {})", method, resp.message, resp.code),
        None => eyre!("{} failed: {}", method, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_call_request_builder() {
        let uni = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
        let request = CallRequest::new(uni, vec![0x06, 0xfd, 0xde, 0x03]).at_block(14_000_000u64);

        assert_eq!(request.to, Some(uni));
        assert_eq!(request.input.as_deref().map(|b| &b[..]), Some(&[0x06, 0xfd, 0xde, 0x03][..]));
        assert_eq!(request.block, BlockNumberOrTag::Number(14_000_000));
    }

    #[test]
    fn test_call_request_defaults_to_latest() {
        let request = CallRequest::new(Address::ZERO, Bytes::new());
        assert_eq!(request.block, BlockNumberOrTag::Latest);
    }
}
