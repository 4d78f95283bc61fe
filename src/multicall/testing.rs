//! In-memory doubles for the transport and aggregate seams

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{address, hex, Address, Bytes};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::abi::{Aggregate, CallOutcome, IMulticall};
use super::version::Aggregator;
use crate::chains::is_multicall_address;
use crate::transport::{CallRequest, CallTransport};

pub const UNI: Address = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
pub const UNKNOWN: Address = address!("d6409e50c05879c5B9E091EB01E9Dd776d00A151");

pub const NAME: [u8; 4] = hex!("06fdde03");
pub const SYMBOL: [u8; 4] = hex!("95d89b41");
pub const DECIMALS: [u8; 4] = hex!("313ce567");

// ============================================
// SCRIPTED AGGREGATE
// ============================================

#[derive(Debug, Clone)]
pub struct Invocation {
    pub aggregator: Aggregator,
    pub calls: Vec<(Address, Bytes)>,
    pub block: BlockNumberOrTag,
}

/// Answers every sub-call with its own payload
#[derive(Default)]
pub struct ScriptedAggregate {
    invocations: Mutex<Vec<Invocation>>,
    failing: Mutex<Vec<BlockNumberOrTag>>,
    truncating: Mutex<Vec<BlockNumberOrTag>>,
}

impl ScriptedAggregate {
    pub fn echo() -> Self {
        Self::default()
    }

    /// Aggregated calls at `block` fail as a whole
    pub fn fail_at(&self, block: BlockNumberOrTag) {
        self.failing.lock().unwrap().push(block);
    }

    /// Aggregated calls at `block` return one result too few
    pub fn truncate_at(&self, block: BlockNumberOrTag) {
        self.truncating.lock().unwrap().push(block);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Aggregate for ScriptedAggregate {
    async fn try_aggregate(
        &self,
        aggregator: &Aggregator,
        calls: Vec<(Address, Bytes)>,
        block: BlockNumberOrTag,
    ) -> Result<Vec<CallOutcome>> {
        self.invocations.lock().unwrap().push(Invocation {
            aggregator: *aggregator,
            calls: calls.clone(),
            block,
        });

        if self.failing.lock().unwrap().contains(&block) {
            return Err(eyre!("upstream connection reset"));
        }

        let mut outcomes: Vec<CallOutcome> = calls
            .into_iter()
            .map(|(_, payload)| CallOutcome::success(payload))
            .collect();
        if self.truncating.lock().unwrap().contains(&block) {
            outcomes.pop();
        }

        Ok(outcomes)
    }
}

// ============================================
// MOCK NODE
// ============================================

/// A node holding fixed `(target, calldata) -> return data` answers.
///
/// Aggregator calls are decoded and executed sub-call by sub-call; unknown
/// sub-calls fail with empty return data, like a call to a contract without
/// that method.
pub struct MockTransport {
    chain_id: u64,
    responses: HashMap<(Address, Bytes), Bytes>,
    failing_blocks: Mutex<Vec<BlockNumberOrTag>>,
    recorded: Mutex<Vec<CallRequest>>,
    chain_id_requests: AtomicUsize,
}

impl MockTransport {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            responses: HashMap::new(),
            failing_blocks: Mutex::new(Vec::new()),
            recorded: Mutex::new(Vec::new()),
            chain_id_requests: AtomicUsize::new(0),
        }
    }

    /// Mainnet node knowing UNI's name, symbol and decimals
    pub fn uniswap() -> Self {
        Self::new(1)
            .with_response(UNI, NAME, b"Uniswap".to_vec())
            .with_response(UNI, SYMBOL, b"UNI".to_vec())
            .with_response(UNI, DECIMALS, vec![18])
    }

    pub fn with_response(
        mut self,
        target: Address,
        input: impl Into<Bytes>,
        output: impl Into<Bytes>,
    ) -> Self {
        self.responses.insert((target, input.into()), output.into());
        self
    }

    /// Every aggregated call at `block` fails as a whole
    pub fn fail_aggregates_at(&self, block: BlockNumberOrTag) {
        self.failing_blocks.lock().unwrap().push(block);
    }

    pub fn recorded(&self) -> Vec<CallRequest> {
        self.recorded.lock().unwrap().clone()
    }

    /// Recorded `eth_call`s sent to an aggregator, with their decoded sub-calls
    pub fn aggregated(&self) -> Vec<(CallRequest, Vec<(Address, Bytes)>)> {
        self.recorded()
            .into_iter()
            .filter(|req| req.to.as_ref().is_some_and(is_multicall_address))
            .map(|req| {
                let input = req.input.clone().unwrap_or_default();
                let decoded = IMulticall::tryAggregateCall::abi_decode(&input).unwrap();
                let calls = decoded
                    .calls
                    .into_iter()
                    .map(|call| (call.target, call.callData))
                    .collect();
                (req, calls)
            })
            .collect()
    }

    /// Recorded `eth_call`s that did not go through an aggregator
    pub fn direct(&self) -> Vec<CallRequest> {
        self.recorded()
            .into_iter()
            .filter(|req| !req.to.as_ref().is_some_and(is_multicall_address))
            .collect()
    }

    pub fn chain_id_requests(&self) -> usize {
        self.chain_id_requests.load(Ordering::SeqCst)
    }

    fn execute_aggregate(&self, input: &[u8]) -> Result<Bytes> {
        let decoded = IMulticall::tryAggregateCall::abi_decode(input)
            .map_err(|e| eyre!("invalid tryAggregate calldata: {}", e))?;

        let results: Vec<IMulticall::Result> = decoded
            .calls
            .into_iter()
            .map(|call| match self.responses.get(&(call.target, call.callData)) {
                Some(output) => IMulticall::Result {
                    success: true,
                    returnData: output.clone(),
                },
                None => IMulticall::Result {
                    success: false,
                    returnData: Bytes::new(),
                },
            })
            .collect();

        Ok(IMulticall::tryAggregateCall::abi_encode_returns(&results).into())
    }
}

#[async_trait]
impl CallTransport for MockTransport {
    async fn chain_id(&self) -> Result<u64> {
        self.chain_id_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.chain_id)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes> {
        self.recorded.lock().unwrap().push(request.clone());

        let (to, input) = match (request.to, request.input) {
            (Some(to), Some(input)) => (to, input),
            _ => return Err(eyre!("execution reverted")),
        };

        if is_multicall_address(&to) && input.starts_with(&IMulticall::tryAggregateCall::SELECTOR) {
            if self.failing_blocks.lock().unwrap().contains(&request.block) {
                return Err(eyre!("upstream connection reset"));
            }
            return self.execute_aggregate(&input);
        }

        self.responses
            .get(&(to, input))
            .cloned()
            .ok_or_else(|| eyre!("execution reverted"))
    }

    async fn raw_request(&self, method: &str, params: Value) -> Result<Value> {
        Ok(json!({ "method": method, "params": params }))
    }
}
