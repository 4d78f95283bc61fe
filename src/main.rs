//! Multicall Provider - batching check against a live node
//!
//! Run with: cargo run -- --token 0x1f98... --token 0xA0b8...
//!
//! Reads name/symbol/decimals of a few ERC-20 tokens twice: once with one
//! `eth_call` per read, once through the multicall provider, then checks that
//! both runs returned the same bytes.

use alloy_primitives::{address, Address, Bytes};
use alloy_provider::ProviderBuilder;
use alloy_sol_types::{sol, SolCall};
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multicall_provider::{AlloyTransport, CallRequest, CallTransport, MulticallConfig, MulticallProvider};

sol! {
    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

const DEFAULT_TOKENS: [Address; 4] = [
    address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984"), // UNI
    address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), // USDC
    address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), // WETH
    address!("6B175474E89094C44Da98b954EedcdeCB5BE3830"), // DAI
];

#[derive(Debug, Parser)]
#[command(name = "multicall-provider", version, about = "Compare direct and batched eth_call reads")]
struct Cli {
    /// TOML config file (default: environment / .env)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Token to read; repeat for several (default: UNI, USDC, WETH, DAI)
    #[arg(short, long = "token")]
    tokens: Vec<Address>,

    /// Read at this block instead of latest
    #[arg(short, long)]
    block: Option<u64>,

    /// Override the debounce delay (ms)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Override the max calldata bytes per aggregated call
    #[arg(long)]
    max_data_length: Option<usize>,

    /// Write the effective configuration to this file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<MulticallConfig> {
        let mut config = match &self.config {
            Some(path) => MulticallConfig::from_file(path)?,
            None => MulticallConfig::from_env()?,
        };

        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.multicall_delay_ms = delay_ms;
        }
        if let Some(max_data_length) = self.max_data_length {
            config.max_multicall_data_length = max_data_length;
        }

        Ok(config)
    }
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" MULTICALL PROVIDER - direct vs batched eth_call").cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

/// name(), symbol(), decimals() for every token, in that order
fn metadata_requests(tokens: &[Address], block: Option<u64>) -> Vec<CallRequest> {
    tokens
        .iter()
        .flat_map(|&token| {
            [
                IERC20Metadata::nameCall {}.abi_encode(),
                IERC20Metadata::symbolCall {}.abi_encode(),
                IERC20Metadata::decimalsCall {}.abi_encode(),
            ]
            .map(|input| match block {
                Some(block) => CallRequest::new(token, input).at_block(block),
                None => CallRequest::new(token, input),
            })
        })
        .collect()
}

fn describe(results: &[Result<Bytes>]) -> String {
    let name = results[0]
        .as_ref()
        .ok()
        .and_then(|data| IERC20Metadata::nameCall::abi_decode_returns(data).ok())
        .unwrap_or_else(|| "?".to_string());
    let symbol = results[1]
        .as_ref()
        .ok()
        .and_then(|data| IERC20Metadata::symbolCall::abi_decode_returns(data).ok())
        .unwrap_or_else(|| "?".to_string());
    let decimals = results[2]
        .as_ref()
        .ok()
        .and_then(|data| IERC20Metadata::decimalsCall::abi_decode_returns(data).ok())
        .map(|d| d.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!("{} ({}), {} decimals", name, symbol, decimals)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multicall_provider=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file or --config");
        return Err(e);
    }

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    print_banner();
    config.print_summary();
    println!();

    let tokens = if cli.tokens.is_empty() {
        DEFAULT_TOKENS.to_vec()
    } else {
        cli.tokens.clone()
    };

    let node = Arc::new(AlloyTransport::new(
        ProviderBuilder::new().connect_http(config.rpc_url.parse()?),
    ));
    let provider = MulticallProvider::from_arc(Arc::clone(&node), &config);

    let chain_id = provider.chain_id().await?;
    info!("Connected to chain {}", chain_id);

    let requests = metadata_requests(&tokens, cli.block);

    // =============================================
    // DIRECT: one eth_call per read
    // =============================================
    println!("{}", style("═══ DIRECT ═══").blue().bold());
    let start = Instant::now();
    let direct = join_all(requests.iter().cloned().map(|r| node.call(r))).await;
    let direct_time = start.elapsed();
    println!("   {} reads, {} eth_calls in {:?}", requests.len(), requests.len(), direct_time);

    // =============================================
    // BATCHED: same reads through the provider
    // =============================================
    println!("{}", style("═══ BATCHED ═══").blue().bold());
    let start = Instant::now();
    let batched = join_all(requests.iter().cloned().map(|r| provider.call(r))).await;
    let batched_time = start.elapsed();
    println!("   {} reads in {:?}", requests.len(), batched_time);
    println!();

    let mut mismatches = 0;
    for (i, token) in tokens.iter().enumerate() {
        let range = i * 3..i * 3 + 3;
        let same = direct[range.clone()]
            .iter()
            .zip(&batched[range.clone()])
            .all(|(d, b)| match (d, b) {
                (Ok(d), Ok(b)) => d == b,
                (Err(_), Err(_)) => true,
                _ => false,
            });

        let mark = if same {
            style("✓").green()
        } else {
            mismatches += 1;
            style("✗").red()
        };
        println!("   {} {} {}", mark, token, describe(&batched[range]));
    }
    println!();

    if direct_time > batched_time {
        info!(
            "Batched reads were {:.1}x faster",
            direct_time.as_secs_f64() / batched_time.as_secs_f64().max(f64::EPSILON)
        );
    } else {
        warn!("Batched reads were not faster ({:?} vs {:?})", batched_time, direct_time);
    }

    if mismatches > 0 {
        return Err(eyre!("{} tokens returned different data when batched", mismatches));
    }

    println!("{}", style("All batched reads match the direct reads").green().bold());
    Ok(())
}
