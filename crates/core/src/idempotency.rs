//! Duplicate-delivery suppression for the webhook receiver.
//!
//! [`IdempotencyCache`] is a bounded TTL cache keyed by the client-supplied
//! `Idempotency-Key`: a known, unexpired key means the delivery was already
//! processed and must be ignored. [`RetryTracker`] bounds how often a
//! caller may replay the same `X-Retry-ID` before being told to stop.
//!
//! Both structures are shared across request handlers behind `&self`, so
//! the interior map lives in a `Mutex`; entries are small and the capacity
//! is bounded, keeping contention and memory flat.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

/// Default maximum number of idempotency keys retained.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default time-to-live for an idempotency key.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Maximum times a single retry id is admitted before `410 Gone`.
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// IdempotencyCache
// ---------------------------------------------------------------------------

/// Bounded TTL cache of recently seen idempotency keys.
///
/// Expired entries are evicted lazily on access; when full, the oldest
/// entry is evicted first (insertion order).
pub struct IdempotencyCache {
    entries: Mutex<IndexMap<String, Instant>>,
    capacity: usize,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity,
            ttl,
        }
    }

    /// Check whether `key` was already seen; record it if not.
    ///
    /// Returns `true` for a duplicate (caller should short-circuit).
    pub fn check_and_record(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// Number of live entries (for metrics).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("idempotency cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().expect("idempotency cache poisoned");

        entries.retain(|_, seen| now.duration_since(*seen) < self.ttl);

        if entries.contains_key(key) {
            return true;
        }

        if entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(key.to_string(), now);
        false
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}

// ---------------------------------------------------------------------------
// RetryTracker
// ---------------------------------------------------------------------------

/// Bounded per-id retry counter backing the `/webhook/retry` endpoint.
pub struct RetryTracker {
    counts: Mutex<IndexMap<String, u32>>,
    capacity: usize,
    max_attempts: u32,
}

impl RetryTracker {
    pub fn new(capacity: usize, max_attempts: u32) -> Self {
        Self {
            counts: Mutex::new(IndexMap::new()),
            capacity,
            max_attempts,
        }
    }

    /// Admit or refuse one more attempt for `retry_id`.
    ///
    /// Returns `true` while the id has attempts left (and consumes one);
    /// `false` once exhausted — the caller should answer `410 Gone`.
    pub fn admit(&self, retry_id: &str) -> bool {
        let mut counts = self.counts.lock().expect("retry tracker poisoned");

        let count = counts.get(retry_id).copied().unwrap_or(0);
        if count >= self.max_attempts {
            return false;
        }

        if !counts.contains_key(retry_id) && counts.len() >= self.capacity {
            counts.shift_remove_index(0);
        }
        counts.insert(retry_id.to_string(), count + 1);
        true
    }
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, MAX_RETRY_ATTEMPTS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
