//! Response cache
//!
//! Shares one in-flight call between every caller asking for the same
//! `(target, calldata, block)`. Only concrete block numbers are cached: the
//! answer for `latest` changes under the caller's feet.
//!
//! Entries live for a fixed TTL. Every entry is driven to completion by its
//! own task, and a failed entry removes itself from the map, so a failure is
//! never served to a later caller even when all of its callers gave up.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, Bytes};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tracing::trace;

use super::version;
use crate::error::CallResult;

pub type SharedCall = Shared<BoxFuture<'static, CallResult>>;

type Entries = Mutex<HashMap<CacheKey, Entry>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    target: Address,
    payload: Bytes,
    block: u64,
}

impl CacheKey {
    /// `None` when `block` is not a fixed point in the chain
    pub fn new(target: Address, payload: &Bytes, block: &BlockNumberOrTag) -> Option<Self> {
        version::block_number(block).map(|block| Self {
            target,
            payload: payload.clone(),
            block,
        })
    }
}

struct Entry {
    id: u64,
    call: SharedCall,
    inserted: Instant,
}

pub struct ResponseCache {
    ttl: Duration,
    next_id: AtomicU64,
    entries: Arc<Entries>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: AtomicU64::new(0),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the live entry for `key`, or start the call with `start` and
    /// remember it. Must be called inside a tokio runtime.
    pub fn get_or_start<F>(&self, key: CacheKey, start: F) -> SharedCall
    where
        F: FnOnce() -> BoxFuture<'static, CallResult>,
    {
        let call = {
            let mut entries = match self.entries.lock() {
                Ok(entries) => entries,
                // Poisoned: serve uncached
                Err(_) => return start().shared(),
            };

            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted.elapsed() < ttl);

            if let Some(entry) = entries.get(&key) {
                trace!("Cache hit for {} at block {}", key.target, key.block);
                return entry.call.clone();
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let call = evict_on_failure(start(), Arc::downgrade(&self.entries), key.clone(), id);
            entries.insert(
                key,
                Entry {
                    id,
                    call: call.clone(),
                    inserted: Instant::now(),
                },
            );
            call
        };

        // Settles the entry even if every caller stops waiting
        tokio::spawn(call.clone().map(|_| ()));
        call
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wrap `call` so that an error removes entry `id` under `key`, and only that
/// entry: a newer call stored under the same key after expiry stays.
fn evict_on_failure(
    call: BoxFuture<'static, CallResult>,
    entries: Weak<Entries>,
    key: CacheKey,
    id: u64,
) -> SharedCall {
    async move {
        let result = call.await;
        if result.is_err() {
            if let Some(entries) = entries.upgrade() {
                if let Ok(mut entries) = entries.lock() {
                    if entries.get(&key).is_some_and(|entry| entry.id == id) {
                        entries.remove(&key);
                    }
                }
            }
        }
        result
    }
    .boxed()
    .shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MulticallError;
    use crate::multicall::testing::UNI;
    use crate::multicall::CallOutcome;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    fn counting_call(counter: &Arc<AtomicUsize>, result: CallResult) -> BoxFuture<'static, CallResult> {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { result }.boxed()
    }

    fn payload() -> Bytes {
        Bytes::from(vec![0x06, 0xfd, 0xde, 0x03])
    }

    #[test]
    fn test_unresolved_blocks_have_no_key() {
        assert!(CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Latest).is_none());
        assert!(CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Pending).is_none());
        assert!(CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Safe).is_none());
        assert!(CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Number(18_000_000)).is_some());
    }

    #[tokio::test]
    async fn test_identical_calls_share_one_request() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Number(18_000_000)).unwrap();

        let first = cache.get_or_start(key.clone(), || {
            counting_call(&counter, Ok(CallOutcome::success(b"Uniswap".to_vec())))
        });
        let second = cache.get_or_start(key, || {
            counting_call(&counter, Ok(CallOutcome::success(b"other".to_vec())))
        });

        assert_eq!(first.await.unwrap(), second.await.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Number(1)).unwrap();

        cache
            .get_or_start(key.clone(), || counting_call(&counter, Ok(CallOutcome::success(vec![1]))))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .get_or_start(key, || counting_call(&counter, Ok(CallOutcome::success(vec![1]))))
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_evicts_itself_without_callers() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Number(1)).unwrap();
        let (fail, failed) = oneshot::channel::<()>();

        let abandoned = cache.get_or_start(key.clone(), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = failed.await;
                Err(MulticallError::Dropped)
            }
            .boxed()
        });
        drop(abandoned);
        assert_eq!(cache.len(), 1);

        fail.send(()).unwrap();
        sleep(Duration::from_millis(20)).await;
        assert!(cache.is_empty());

        cache
            .get_or_start(key, || counting_call(&counter, Ok(CallOutcome::success(vec![1]))))
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_late_failure_keeps_newer_entry() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        let key = CacheKey::new(UNI, &payload(), &BlockNumberOrTag::Number(1)).unwrap();
        let (fail, failed) = oneshot::channel::<()>();

        let slow = cache.get_or_start(key.clone(), || {
            async move {
                let _ = failed.await;
                Err(MulticallError::Dropped)
            }
            .boxed()
        });
        sleep(Duration::from_millis(20)).await;

        // The slow entry expired; a fresh one takes its key
        let (_keep_pending, pending) = oneshot::channel::<()>();
        let _fresh = cache.get_or_start(key, || {
            async move {
                let _ = pending.await;
                Ok(CallOutcome::success(vec![1]))
            }
            .boxed()
        });
        assert_eq!(cache.len(), 1);

        fail.send(()).unwrap();
        assert!(slow.await.is_err());
        sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.len(), 1);
    }
}
