//! Multicall provider
//!
//! A `CallTransport` decorator. Plain `eth_call`s are queued and sent in
//! batches through the chain's Multicall contract; anything the batcher cannot
//! or should not aggregate goes straight to the wrapped transport. Every other
//! JSON-RPC method is forwarded untouched.
//!
//! ```ignore
//! let node = AlloyTransport::new(ProviderBuilder::new().on_http(url));
//! let provider = MulticallProvider::new(node, &MulticallConfig::default());
//!
//! // Issued concurrently, sent as one aggregated eth_call
//! let (name, symbol, decimals) = tokio::join!(
//!     provider.call(CallRequest::new(token, nameCall {}.abi_encode())),
//!     provider.call(CallRequest::new(token, symbolCall {}.abi_encode())),
//!     provider.call(CallRequest::new(token, decimalsCall {}.abi_encode())),
//! );
//! ```

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use eyre::Result;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::config::MulticallConfig;
use crate::error::MulticallError;
use crate::multicall::{
    gate, Aggregate, BatchSettings, CacheKey, CallHandle, CallOutcome, Dispatcher, FlushScheduler,
    PendingCall, ResponseCache, Route, TryAggregateCodec,
};
use crate::transport::{CallRequest, CallTransport};

pub struct MulticallProvider<T> {
    inner: Arc<T>,
    chain_id: OnceCell<u64>,
    settings: Arc<BatchSettings>,
    scheduler: FlushScheduler,
    cache: Option<ResponseCache>,
}

impl<T: CallTransport> MulticallProvider<T> {
    /// Wrap `inner`. Must be called inside a tokio runtime: the flush worker
    /// is spawned here and lives as long as the provider.
    pub fn new(inner: T, config: &MulticallConfig) -> Self {
        Self::from_arc(Arc::new(inner), config)
    }

    /// Wrap a transport that is also used elsewhere
    pub fn from_arc(inner: Arc<T>, config: &MulticallConfig) -> Self {
        let aggregate = Arc::new(TryAggregateCodec::new(Arc::clone(&inner)));
        Self::with_aggregate(inner, aggregate, config)
    }

    /// Wrap `inner`, sending aggregated calls through `aggregate`
    pub fn with_aggregate(
        inner: Arc<T>,
        aggregate: Arc<dyn Aggregate>,
        config: &MulticallConfig,
    ) -> Self {
        let settings = Arc::new(BatchSettings::from_config(config));
        let dispatcher = Arc::new(Dispatcher::new(aggregate, Arc::clone(&settings)));
        let scheduler = FlushScheduler::spawn(dispatcher, Arc::clone(&settings));
        let cache = config
            .cache_enabled
            .then(|| ResponseCache::new(config.cache_ttl()));

        debug!(
            "Multicall provider ready (delay {:?}, max data length {}, cache {})",
            config.multicall_delay(),
            config.max_multicall_data_length,
            config.cache_enabled
        );

        Self {
            inner,
            chain_id: OnceCell::new_with(config.chain_id),
            settings,
            scheduler,
            cache,
        }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    // ========== Runtime settings ==========

    pub fn multicall_delay(&self) -> Duration {
        self.scheduler.delay()
    }

    /// Calls queued under the previous delay are dispatched immediately
    pub fn set_multicall_delay(&self, delay: Duration) {
        self.scheduler.set_delay(delay);
    }

    pub fn max_multicall_data_length(&self) -> usize {
        self.settings.max_data_length()
    }

    /// Applies from the next flush cycle on
    pub fn set_max_multicall_data_length(&self, max_data_length: usize) {
        self.settings.set_max_data_length(max_data_length);
    }

    pub fn is_multicall_enabled(&self) -> bool {
        self.settings.enabled()
    }

    /// Calls already queued are still aggregated
    pub fn set_multicall_enabled(&self, enabled: bool) {
        self.settings.set_enabled(enabled);
    }

    /// Dispatch everything queued so far without waiting for the debounce
    pub async fn flush(&self) {
        self.scheduler.flush().await;
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    // ========== Calls ==========

    /// Like `call`, but a sub-call reported as failed by the aggregator comes
    /// back as `success = false` instead of an error.
    ///
    /// Calls that bypassed aggregation report `success = true`; their
    /// failures are the wrapped transport's errors.
    pub async fn call_outcome(&self, request: CallRequest) -> Result<CallOutcome> {
        let enabled = self.settings.enabled();
        if let Some(reason) = gate::precheck(&request, enabled) {
            trace!("Bypassing multicall: {}", reason);
            return self.inner.call(request).await.map(CallOutcome::success);
        }

        let chain_id = self.chain_id().await?;
        let aggregator = match gate::route(&request, enabled, chain_id) {
            Route::Enqueue(aggregator) => aggregator,
            Route::Bypass(reason) => {
                trace!("Bypassing multicall: {}", reason);
                return self.inner.call(request).await.map(CallOutcome::success);
            }
        };

        let (Some(target), Some(payload)) = (request.to, request.input.clone()) else {
            return self.inner.call(request).await.map(CallOutcome::success);
        };
        let block = request.block;
        trace!("Queueing call to {} at {} via {}", target, block, aggregator.version);

        let key = CacheKey::new(target, &payload, &block);
        let result = match (&self.cache, key) {
            (Some(cache), Some(key)) => {
                cache
                    .get_or_start(key, || {
                        self.enqueue(target, payload, block, chain_id).wait().boxed()
                    })
                    .await
            }
            _ => self.enqueue(target, payload, block, chain_id).wait().await,
        };

        result.map_err(eyre::Report::new)
    }

    fn enqueue(
        &self,
        target: Address,
        payload: Bytes,
        block: BlockNumberOrTag,
        chain_id: u64,
    ) -> CallHandle {
        let (call, handle) = PendingCall::new(target, payload, block, chain_id);
        self.scheduler.enqueue(call);
        handle
    }
}

#[async_trait]
impl<T: CallTransport> CallTransport for MulticallProvider<T> {
    async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| self.inner.chain_id())
            .await
            .copied()
    }

    /// A sub-call that failed inside the aggregator surfaces as
    /// `MulticallError::Reverted`, the way a direct `eth_call` would revert.
    async fn call(&self, request: CallRequest) -> Result<Bytes> {
        let outcome = self.call_outcome(request).await?;
        if outcome.success {
            Ok(outcome.return_data)
        } else {
            Err(MulticallError::Reverted {
                data: outcome.return_data,
            }
            .into())
        }
    }

    async fn raw_request(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.raw_request(method, params).await
    }
}
