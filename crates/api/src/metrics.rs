//! Receiver counters exposed on `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for the webhook receiver. Cheap to read from any
/// thread; never blocks request handling.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Events accepted and handed to the listener.
    pub received: AtomicU64,
    /// Deliveries short-circuited by the idempotency cache.
    pub duplicates: AtomicU64,
    /// Requests rejected by the admission pipeline.
    pub rejected: AtomicU64,
    /// Retry attempts refused with `410 Gone`.
    pub retries_exhausted: AtomicU64,
}

impl Metrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
