//! Pending call queue
//!
//! Calls that passed the bypass gate wait here until the next flush. Each
//! call carries the sending half of a oneshot channel; settling consumes it,
//! so a call can be settled at most once.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{CallResult, MulticallError};

/// A call waiting for aggregation
#[derive(Debug)]
pub struct PendingCall {
    pub target: Address,
    pub payload: Bytes,
    pub block: BlockNumberOrTag,
    pub chain_id: u64,
    respond_to: oneshot::Sender<CallResult>,
}

impl PendingCall {
    /// Create a pending call and the handle its caller waits on
    pub fn new(
        target: Address,
        payload: Bytes,
        block: BlockNumberOrTag,
        chain_id: u64,
    ) -> (Self, CallHandle) {
        let (tx, rx) = oneshot::channel();
        let call = Self {
            target,
            payload,
            block,
            chain_id,
            respond_to: tx,
        };
        (call, CallHandle { rx })
    }

    /// Settle the call. A caller that stopped waiting is ignored.
    pub fn settle(self, result: CallResult) {
        let _ = self.respond_to.send(result);
    }
}

/// Completion handle returned at enqueue time
#[derive(Debug)]
pub struct CallHandle {
    rx: oneshot::Receiver<CallResult>,
}

impl CallHandle {
    /// Wait for the flush cycle that carries this call to settle it
    pub async fn wait(self) -> CallResult {
        self.rx.await.unwrap_or(Err(MulticallError::Dropped))
    }
}

/// Insertion-ordered queue plus the instant its oldest entry arrived
#[derive(Debug, Default)]
pub struct PendingQueue {
    calls: Vec<PendingCall>,
    first_arrival: Option<Instant>,
}

impl PendingQueue {
    pub fn push(&mut self, call: PendingCall) {
        if self.calls.is_empty() {
            self.first_arrival = Some(Instant::now());
        }
        self.calls.push(call);
    }

    /// Swap out the whole content, leaving an empty queue behind
    pub fn drain(&mut self) -> Vec<PendingCall> {
        self.first_arrival = None;
        std::mem::take(&mut self.calls)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn first_arrival(&self) -> Option<Instant> {
        self.first_arrival
    }
}
