//! Runtime-mutable batching knobs shared by the gate, the scheduler and the
//! dispatcher of one provider.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::MulticallConfig;

#[derive(Debug)]
pub struct BatchSettings {
    enabled: AtomicBool,
    max_data_length: AtomicUsize,
    delay_us: AtomicU64,
    max_wait_ms: AtomicU64,
}

impl BatchSettings {
    pub fn from_config(config: &MulticallConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.multicall_enabled),
            max_data_length: AtomicUsize::new(config.max_multicall_data_length),
            delay_us: AtomicU64::new(config.multicall_delay_ms.saturating_mul(1_000)),
            max_wait_ms: AtomicU64::new(config.max_flush_wait_ms),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Maximum cumulative calldata bytes per aggregated call (0 = unbounded)
    pub fn max_data_length(&self) -> usize {
        self.max_data_length.load(Ordering::Relaxed)
    }

    pub fn set_max_data_length(&self, max_data_length: usize) {
        self.max_data_length.store(max_data_length, Ordering::Relaxed);
    }

    pub fn delay(&self) -> Duration {
        Duration::from_micros(self.delay_us.load(Ordering::Relaxed))
    }

    /// Written by `FlushScheduler::set_delay`, which also flushes the queue.
    /// Kept at microsecond resolution.
    pub(crate) fn store_delay(&self, delay: Duration) {
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        self.delay_us.store(micros, Ordering::Relaxed);
    }

    /// Upper bound on how long the oldest queued call waits (`None` = no bound)
    pub fn max_wait(&self) -> Option<Duration> {
        match self.max_wait_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
