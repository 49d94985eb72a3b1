//! Pipeline metrics for observability
//!
//! Counters for the manager (emitted, queued, dropped) and for batching
//! transports (flushes, retries, delivery failures, evictions).

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters describing pipeline health
///
/// # Example
///
/// ```
/// use rust_log_pipeline::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
/// metrics.record_emitted();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.emitted(), 1);
/// assert_eq!(metrics.dropped(), 1);
/// ```
#[derive(Debug)]
pub struct PipelineMetrics {
    /// Entries handed to the transports
    emitted: AtomicU64,

    /// Entries held back until all transports were ready
    queued: AtomicU64,

    /// Entries discarded (manager stopped, or never started)
    dropped: AtomicU64,

    /// Flushes that actually detached a batch
    flushes: AtomicU64,

    /// Lines confirmed delivered by a sink
    delivered_lines: AtomicU64,

    /// Delivery attempts retried after a failure
    retries: AtomicU64,

    /// Flushes that exhausted every attempt
    delivery_failures: AtomicU64,

    /// Buffered lines evicted to stay under the memory bound
    evicted: AtomicU64,
}

impl PipelineMetrics {
    pub const fn new() -> Self {
        Self {
            emitted: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            delivered_lines: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered_lines(&self) -> u64 {
        self.delivered_lines.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Each `record_*` returns the previous value
    #[inline]
    pub fn record_emitted(&self) -> u64 {
        self.emitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queued(&self) -> u64 {
        self.queued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped_many(&self, count: u64) -> u64 {
        self.dropped.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self, lines: u64) -> u64 {
        self.delivered_lines.fetch_add(lines, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_retry(&self) -> u64 {
        self.retries.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivery_failure(&self) -> u64 {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_evicted(&self, lines: u64) -> u64 {
        self.evicted.fetch_add(lines, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped() as f64;
        let total = self.emitted() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.emitted,
            &self.queued,
            &self.dropped,
            &self.flushes,
            &self.delivered_lines,
            &self.retries,
            &self.delivery_failures,
            &self.evicted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            emitted: AtomicU64::new(self.emitted()),
            queued: AtomicU64::new(self.queued()),
            dropped: AtomicU64::new(self.dropped()),
            flushes: AtomicU64::new(self.flushes()),
            delivered_lines: AtomicU64::new(self.delivered_lines()),
            retries: AtomicU64::new(self.retries()),
            delivery_failures: AtomicU64::new(self.delivery_failures()),
            evicted: AtomicU64::new(self.evicted()),
        }
    }
}
