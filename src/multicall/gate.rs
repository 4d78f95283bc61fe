//! Bypass gate
//!
//! Decides, per incoming call, whether it is aggregated or sent straight to
//! the raw transport. Pure: it never touches the queue.
//! Checks run in order: disabled, not a call, aggregator target, no aggregator.

use super::version::{self, Aggregator};
use crate::chains::is_multicall_address;
use crate::transport::CallRequest;

/// Why a call skipped aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Aggregation is switched off on this provider
    Disabled,
    /// No target or no calldata
    NotACall,
    /// The call targets an aggregator contract itself
    AggregatorTarget,
    /// No aggregator deployed on this chain at this block
    NoAggregator,
}

impl std::fmt::Display for BypassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BypassReason::Disabled => write!(f, "multicall disabled"),
            BypassReason::NotACall => write!(f, "missing target or calldata"),
            BypassReason::AggregatorTarget => write!(f, "call to a multicall contract"),
            BypassReason::NoAggregator => write!(f, "no multicall at this block"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bypass(BypassReason),
    Enqueue(Aggregator),
}

/// Checks that need no chain information. `None` means the call is still a
/// candidate for aggregation.
pub fn precheck(request: &CallRequest, enabled: bool) -> Option<BypassReason> {
    if !enabled {
        return Some(BypassReason::Disabled);
    }

    match (&request.to, &request.input) {
        (Some(to), Some(_)) if is_multicall_address(to) => Some(BypassReason::AggregatorTarget),
        (Some(_), Some(_)) => None,
        _ => Some(BypassReason::NotACall),
    }
}

/// Route `request` on `chain_id`
pub fn route(request: &CallRequest, enabled: bool, chain_id: u64) -> Route {
    if let Some(reason) = precheck(request, enabled) {
        return Route::Bypass(reason);
    }

    match version::resolve(chain_id, version::block_number(&request.block)) {
        Some(aggregator) => Route::Enqueue(aggregator),
        None => Route::Bypass(BypassReason::NoAggregator),
    }
}
