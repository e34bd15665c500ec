use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::metrics::Metrics;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Service identifier.
    pub service: &'static str,
    /// Configured bind port.
    pub port: u16,
    /// Whether the API-key check is active.
    pub authentication: bool,
    /// Whether HMAC signature validation is active.
    pub hmac_validation: bool,
}

/// GET /health -- receiver status and configuration flags. Unauthenticated.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "rollcall-webhook-receiver",
        port: state.config.port,
        authentication: state.config.authentication_enabled(),
        hmac_validation: state.config.hmac_enabled(),
    })
}

/// GET /metrics -- endpoint list and request counters. Unauthenticated.
async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "endpoints": ["/webhook", "/webhook/retry", "/health", "/metrics"],
        "counters": {
            "received": Metrics::get(&state.metrics.received),
            "duplicates": Metrics::get(&state.metrics.duplicates),
            "rejected": Metrics::get(&state.metrics.rejected),
            "retries_exhausted": Metrics::get(&state.metrics.retries_exhausted),
            "idempotency_cache_size": state.idempotency.len(),
        },
    }))
}

/// Mount the unauthenticated side endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}
