use std::sync::Arc;

use rollcall_core::idempotency::{IdempotencyCache, RetryTracker};

use crate::config::ReceiverConfig;
use crate::listener::WebhookListener;
use crate::metrics::Metrics;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Receiver configuration (keys, secrets, bind address).
    pub config: Arc<ReceiverConfig>,
    /// Duplicate-delivery cache keyed by `Idempotency-Key`.
    pub idempotency: Arc<IdempotencyCache>,
    /// Bounded retry counter keyed by `X-Retry-ID`.
    pub retries: Arc<RetryTracker>,
    /// Request counters exposed on `/metrics`.
    pub metrics: Arc<Metrics>,
    /// Registered consumer of accepted events.
    pub listener: Arc<dyn WebhookListener>,
}

impl AppState {
    /// Assemble state with fresh caches and counters.
    pub fn new(config: ReceiverConfig, listener: Arc<dyn WebhookListener>) -> Self {
        Self {
            config: Arc::new(config),
            idempotency: Arc::new(IdempotencyCache::default()),
            retries: Arc::new(RetryTracker::default()),
            metrics: Arc::new(Metrics::default()),
            listener,
        }
    }
}
