//! Aggregator version selection
//!
//! Picks the aggregator contract usable on a chain at a given block:
//! Multicall3 for recent/latest blocks, Multicall2 for blocks between the two
//! deployments, nothing for blocks that predate both.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::Address;

use crate::chains::{
    multicall2_deployment_block, multicall3_address, multicall3_deployment_block,
    MULTICALL2_ADDRESS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MulticallVersion {
    V2,
    V3,
}

impl std::fmt::Display for MulticallVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MulticallVersion::V2 => write!(f, "Multicall2"),
            MulticallVersion::V3 => write!(f, "Multicall3"),
        }
    }
}

/// An aggregator contract resolved for one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    pub chain_id: u64,
    pub address: Address,
    pub version: MulticallVersion,
}

/// Concrete block number designated by a block selector.
///
/// `earliest` is block 0; `latest`, `pending`, `safe` and `finalized` move
/// over time and have no fixed number.
pub fn block_number(block: &BlockNumberOrTag) -> Option<u64> {
    match block {
        BlockNumberOrTag::Number(number) => Some(*number),
        BlockNumberOrTag::Earliest => Some(0),
        _ => None,
    }
}

/// Resolve the aggregator for `chain_id` at `block_number` (`None` = latest).
///
/// A chain without a recorded deployment block is treated as if the
/// deployment lies infinitely far in the future, so concrete blocks on
/// unknown chains are never aggregated while latest calls use Multicall3.
pub fn resolve(chain_id: u64, block_number: Option<u64>) -> Option<Aggregator> {
    if let Some(block) = block_number {
        let deployed_v3 = multicall3_deployment_block(chain_id).unwrap_or(u64::MAX);

        if block <= deployed_v3 {
            let deployed_v2 = multicall2_deployment_block(chain_id).unwrap_or(u64::MAX);
            if block <= deployed_v2 {
                return None;
            }

            return Some(Aggregator {
                chain_id,
                address: MULTICALL2_ADDRESS,
                version: MulticallVersion::V2,
            });
        }
    }

    Some(Aggregator {
        chain_id,
        address: multicall3_address(chain_id),
        version: MulticallVersion::V3,
    })
}
