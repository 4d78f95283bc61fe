//! Batching Configuration
//!
//! All knobs of a `MulticallProvider`, loadable from the environment (and a
//! `.env` file) or from a TOML file.

use console::style;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default debounce window between the first queued call and the flush
pub const DEFAULT_MULTICALL_DELAY_MS: u64 = 10;

/// Default lifetime of a cached concrete-block response
pub const DEFAULT_CACHE_TTL_MS: u64 = 2_000;

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MulticallConfig {
    // ========== Network Settings ==========
    /// JSON-RPC endpoint of the node being wrapped
    pub rpc_url: String,

    /// Chain id of the endpoint. `None` = ask the node once, on first use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,

    // ========== Batching ==========
    /// Debounce window in milliseconds. Every new call pushes the flush back
    /// by this much.
    pub multicall_delay_ms: u64,

    /// Longest a queued call may wait for a flush while arrivals keep
    /// extending the window (0 = unbounded)
    pub max_flush_wait_ms: u64,

    /// Maximum cumulative calldata bytes per aggregated call (0 = unbounded)
    pub max_multicall_data_length: usize,

    /// Master switch. When off every call goes straight to the node
    pub multicall_enabled: bool,

    // ========== Response Cache ==========
    pub cache_enabled: bool,
    pub cache_ttl_ms: u64,
}

impl MulticallConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: env::var("CHAIN_ID").ok().and_then(|s| s.parse().ok()),

            multicall_delay_ms: env::var("MULTICALL_DELAY_MS")
                .unwrap_or_else(|_| DEFAULT_MULTICALL_DELAY_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_MULTICALL_DELAY_MS),
            max_flush_wait_ms: env::var("MAX_FLUSH_WAIT_MS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            max_multicall_data_length: env::var("MAX_MULTICALL_DATA_LENGTH")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            multicall_enabled: env::var("MULTICALL_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),

            cache_enabled: env::var("MULTICALL_CACHE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            cache_ttl_ms: env::var("MULTICALL_CACHE_TTL_MS")
                .unwrap_or_else(|_| DEFAULT_CACHE_TTL_MS.to_string())
                .parse()
                .unwrap_or(DEFAULT_CACHE_TTL_MS),
        })
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn multicall_delay(&self) -> Duration {
        Duration::from_millis(self.multicall_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a valid node URL"));
        }

        if self.max_flush_wait_ms > 0 && self.max_flush_wait_ms < self.multicall_delay_ms {
            return Err(eyre!(
                "MAX_FLUSH_WAIT_MS ({}) is shorter than MULTICALL_DELAY_MS ({})",
                self.max_flush_wait_ms,
                self.multicall_delay_ms
            ));
        }

        if self.cache_enabled && self.cache_ttl_ms == 0 {
            return Err(eyre!(
                "MULTICALL_CACHE_TTL_MS must be > 0 when the cache is enabled"
            ));
        }

        Ok(())
    }

    pub fn print_summary(&self) {
        let on_off = |flag: bool| {
            if flag {
                style("enabled").green()
            } else {
                style("disabled").red()
            }
        };
        let bounded = |value: u64, unit: &str| {
            if value == 0 {
                "unbounded".to_string()
            } else {
                format!("{} {}", value, unit)
            }
        };

        println!("{}", style("Multicall provider").bold().cyan());
        println!("  RPC URL:          {}", self.rpc_url);
        println!(
            "  Chain ID:         {}",
            self.chain_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "from node".to_string())
        );
        println!("  Multicall:        {}", on_off(self.multicall_enabled));
        println!("  Delay:            {} ms", self.multicall_delay_ms);
        println!("  Max flush wait:   {}", bounded(self.max_flush_wait_ms, "ms"));
        println!(
            "  Max data length:  {}",
            bounded(self.max_multicall_data_length as u64, "bytes")
        );
        println!(
            "  Cache:            {} ({} ms)",
            on_off(self.cache_enabled),
            self.cache_ttl_ms
        );
    }
}

impl Default for MulticallConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://eth.llamarpc.com".to_string(),
            chain_id: None,
            multicall_delay_ms: DEFAULT_MULTICALL_DELAY_MS,
            max_flush_wait_ms: 0,
            max_multicall_data_length: 0,
            multicall_enabled: true,
            cache_enabled: true,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

// ============================================
// TESTS
// ============================================
