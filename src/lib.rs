//! Multicall Provider
//!
//! Transparent `eth_call` batching: concurrent read calls issued within a
//! short window are grouped by block and sent as `tryAggregate` calls to the
//! chain's Multicall2 / Multicall3 contract.

pub mod chains;
pub mod config;
pub mod error;
pub mod multicall;
pub mod provider;
pub mod transport;

pub use config::MulticallConfig;
pub use error::{CallResult, MulticallError};
pub use multicall::{Aggregate, Aggregator, CallOutcome, MulticallVersion, TryAggregateCodec};
pub use provider::MulticallProvider;
pub use transport::{AlloyTransport, CallRequest, CallTransport};
