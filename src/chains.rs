//! Multicall address book
//!
//! Static per-chain data used to pick an aggregator:
//! - Multicall2 and Multicall3 deployment addresses (default + overrides)
//! - Deployment block of each version per chain
//!
//! Sources: https://github.com/mds1/multicall#multicall2-contract-addresses
//! and https://www.multicall3.com/deployments

use alloy_primitives::{address, Address};
use lazy_static::lazy_static;
use std::collections::HashMap;

// ============================================
// ADDRESSES
// ============================================

/// Multicall2 (same address on all networks)
pub const MULTICALL2_ADDRESS: Address = address!("5BA1e12693Dc8F9c48aAD8770482f4739bEeD696");

/// Multicall3 (same address on all networks, except zkSync)
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Multicall3 on zkSync Era chains
pub const MULTICALL3_ZKSYNC_ADDRESS: Address = address!("F9cda624FBC7e059355ce98a31693d299FACd963");

/// Every known aggregator address. Calls addressed to one of these are never batched.
pub const MULTICALL_ADDRESSES: [Address; 3] = [
    MULTICALL2_ADDRESS,
    MULTICALL3_ADDRESS,
    MULTICALL3_ZKSYNC_ADDRESS,
];

/// Chains where Multicall3 lives at a non-default address
const MULTICALL3_CHAIN_ADDRESSES: &[(u64, Address)] = &[
    (280, MULTICALL3_ZKSYNC_ADDRESS), // zkSync Era Goerli
    (300, MULTICALL3_ZKSYNC_ADDRESS), // zkSync Era Sepolia
    (324, MULTICALL3_ZKSYNC_ADDRESS), // zkSync Era
];

// ============================================
// DEPLOYMENT BLOCKS
// ============================================

const MULTICALL3_DEPLOYMENTS: &[(u64, u64)] = &[
    (1, 14_353_601),          // Mainnet
    (3, 12_063_863),          // Ropsten
    (4, 10_299_530),          // Rinkeby
    (5, 6_507_670),           // Goerli
    (42, 30_285_908),         // Kovan
    (11_155_111, 751_532),    // Sepolia
    (10, 4_286_263),          // Optimism
    (420, 49_461),            // Optimism Goerli
    (42_161, 7_654_707),      // Arbitrum
    (42_170, 1_746_963),      // Arbitrum Nova
    (421_613, 88_114),        // Arbitrum Goerli
    (421_611, 88_114),        // Arbitrum Rinkeby
    (421_614, 81_930),        // Arbitrum Sepolia
    (137, 25_770_160),        // Polygon
    (146, 60),                // Sonic
    (80_001, 25_444_704),     // Polygon Mumbai
    (100, 21_022_491),        // Gnosis
    (43_114, 11_907_934),     // Avalanche
    (43_113, 7_096_959),      // Avalanche Fuji
    (250, 33_001_987),        // Fantom Opera
    (4_002, 8_328_688),       // Fantom Testnet
    (56, 15_921_452),         // BSC
    (97, 17_422_483),         // BSC Testnet
    (1_284, 609_002),         // Moonbeam
    (1_285, 1_597_904),       // Moonriver
    (1_287, 1_850_686),       // Moonbase Alpha Testnet
    (1_666_600_000, 24_185_753), // Harmony
    (25, 1_963_112),          // Cronos
    (122, 16_146_628),        // Fuse
    (14, 3_002_461),          // Flare
    (280, 5_885_690),         // zkSync Era Goerli
    (300, 2_292),             // zkSync Era Sepolia
    (324, 3_908_235),         // zkSync Era
    (1_101, 57_746),          // Polygon zkEVM
    (1_442, 525_686),         // Polygon zkEVM Testnet
    (8_453, 5_022),           // Base
    (84_531, 1_376_988),      // Base Testnet
    (42_220, 13_112_599),     // Celo Mainnet
    (42_787, 14_569_001),     // Celo Alfajores Testnet
];

const MULTICALL2_DEPLOYMENTS: &[(u64, u64)] = &[
    (1, 12_336_033),  // Mainnet
    (3, 9_894_101),   // Ropsten
    (4, 8_283_206),   // Rinkeby
    (5, 4_489_716),   // Goerli
    (42, 24_025_820), // Kovan
];

lazy_static! {
    static ref MULTICALL3_DEPLOYMENT_BLOCKS: HashMap<u64, u64> =
        MULTICALL3_DEPLOYMENTS.iter().copied().collect();
    static ref MULTICALL2_DEPLOYMENT_BLOCKS: HashMap<u64, u64> =
        MULTICALL2_DEPLOYMENTS.iter().copied().collect();
    static ref MULTICALL3_OVERRIDES: HashMap<u64, Address> =
        MULTICALL3_CHAIN_ADDRESSES.iter().copied().collect();
}

// ============================================
// LOOKUPS
// ============================================

/// Block at which Multicall3 was deployed on `chain_id`, if recorded
pub fn multicall3_deployment_block(chain_id: u64) -> Option<u64> {
    MULTICALL3_DEPLOYMENT_BLOCKS.get(&chain_id).copied()
}

/// Block at which Multicall2 was deployed on `chain_id`, if recorded
pub fn multicall2_deployment_block(chain_id: u64) -> Option<u64> {
    MULTICALL2_DEPLOYMENT_BLOCKS.get(&chain_id).copied()
}

/// Multicall3 address on `chain_id`
pub fn multicall3_address(chain_id: u64) -> Address {
    MULTICALL3_OVERRIDES
        .get(&chain_id)
        .copied()
        .unwrap_or(MULTICALL3_ADDRESS)
}

/// Check if an address is one of the known aggregator contracts
pub fn is_multicall_address(addr: &Address) -> bool {
    MULTICALL_ADDRESSES.contains(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zksync_override() {
        assert_eq!(multicall3_address(324), MULTICALL3_ZKSYNC_ADDRESS);
        assert_eq!(multicall3_address(1), MULTICALL3_ADDRESS);
        assert_eq!(multicall3_address(999_999), MULTICALL3_ADDRESS);
    }

    #[test]
    fn test_deployment_tables() {
        assert_eq!(multicall3_deployment_block(1), Some(14_353_601));
        assert_eq!(multicall2_deployment_block(1), Some(12_336_033));
        assert_eq!(multicall2_deployment_block(137), None);

        // Multicall2 always predates Multicall3 where both are recorded
        for (chain_id, v2_block) in MULTICALL2_DEPLOYMENTS {
            let v3_block = multicall3_deployment_block(*chain_id).unwrap();
            assert!(*v2_block < v3_block, "chain {}", chain_id);
        }
    }

    #[test]
    fn test_known_aggregators() {
        assert!(is_multicall_address(&MULTICALL2_ADDRESS));
        assert!(is_multicall_address(&MULTICALL3_ADDRESS));
        assert!(is_multicall_address(&MULTICALL3_ZKSYNC_ADDRESS));
        assert!(!is_multicall_address(&address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984")));
    }
}
