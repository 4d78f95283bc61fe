//! Call batching engine
//!
//! - `gate`: per-call bypass decision
//! - `version`: aggregator selection by chain and block
//! - `queue` / `scheduler`: pending calls and the debounced flush worker
//! - `dispatcher`: one flush cycle (group, chunk, aggregate, settle)
//! - `abi`: the `tryAggregate` codec
//! - `cache`: shared in-flight responses for concrete blocks

pub mod abi;
pub mod cache;
pub mod chunker;
pub mod dispatcher;
pub mod gate;
pub mod queue;
pub mod scheduler;
pub mod settings;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use abi::{decode_try_aggregate, encode_try_aggregate, Aggregate, CallOutcome, TryAggregateCodec};
pub use cache::{CacheKey, ResponseCache};
pub use chunker::{chunk_ranges, split_by_data_length};
pub use dispatcher::{group_by_block, BlockGroup, Dispatcher};
pub use gate::{BypassReason, Route};
pub use queue::{CallHandle, PendingCall, PendingQueue};
pub use scheduler::FlushScheduler;
pub use settings::BatchSettings;
pub use version::{resolve, Aggregator, MulticallVersion};
