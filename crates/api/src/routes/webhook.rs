//! The webhook admission pipeline.
//!
//! Stages run in order and each may short-circuit with a structured JSON
//! error: API key, content type, HMAC signature, retry gate (on the retry
//! path), idempotency, payload validation. Only then is the event handed
//! to the listener — asynchronously, so the response never waits on the
//! consumer. Network input is never trusted past the stage that checked
//! it.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use axum::{routing::post, Json, Router};
use serde_json::json;

use rollcall_core::diff::ChangeKind;
use rollcall_core::signing;

use crate::error::{ApiError, ApiResult};
use crate::listener::WebhookEvent;
use crate::metrics::Metrics;
use crate::state::AppState;

/// Outcome of the admission pipeline.
enum Admission {
    /// Known idempotency key; the event was already processed.
    Duplicate,
    Event(WebhookEvent),
}

/// POST /webhook -- receive one producer event.
async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    handle(state, headers, body, None)
}

/// POST /webhook/retry -- like `/webhook`, but counts attempts per
/// `X-Retry-ID` and answers `410 Gone` once an id is exhausted, telling
/// the caller to stop retrying.
async fn receive_retry(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let retry_id = match header_str(&headers, "x-retry-id") {
        Some(id) => id.to_string(),
        None => {
            Metrics::incr(&state.metrics.rejected);
            return Err(ApiError::MissingRetryId);
        }
    };
    handle(state, headers, body, Some(retry_id))
}

fn handle(
    state: AppState,
    headers: HeaderMap,
    body: Bytes,
    retry_id: Option<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let started = Instant::now();

    match admit(&state, &headers, &body, retry_id.as_deref()) {
        Ok(Admission::Duplicate) => {
            tracing::debug!("Duplicate delivery ignored");
            Ok(Json(json!({ "status": "duplicate_ignored" })))
        }
        Ok(Admission::Event(event)) => {
            Metrics::incr(&state.metrics.received);
            tracing::debug!(
                event_type = %event.kind,
                admission_number = %event.admission_number,
                "Webhook event accepted"
            );

            // The response does not wait for the listener.
            let listener = Arc::clone(&state.listener);
            tokio::spawn(async move { listener.on_event(&event) });

            Ok(Json(json!({
                "status": "ok",
                "processing_time_ms": started.elapsed().as_millis() as u64,
            })))
        }
        Err(e) => {
            if matches!(e, ApiError::RetryExhausted(_)) {
                Metrics::incr(&state.metrics.retries_exhausted);
            } else {
                Metrics::incr(&state.metrics.rejected);
            }
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Admission stages
// ---------------------------------------------------------------------------

fn admit(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    retry_id: Option<&str>,
) -> Result<Admission, ApiError> {
    check_api_key(state, headers)?;
    check_content_type(headers)?;
    check_signature(state, headers, body)?;

    if let Some(id) = retry_id {
        if !state.retries.admit(id) {
            return Err(ApiError::RetryExhausted(id.to_string()));
        }
    }

    if let Some(key) = header_str(headers, "idempotency-key") {
        if state.idempotency.check_and_record(key) {
            Metrics::incr(&state.metrics.duplicates);
            return Ok(Admission::Duplicate);
        }
    }

    parse_event(body).map(Admission::Event)
}

/// Exact-match API key check, active only when a key is configured.
fn check_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.config.api_key else {
        return Ok(());
    };

    match header_str(headers, "x-api-key") {
        None => Err(ApiError::MissingApiKey),
        Some(key) if key != expected => Err(ApiError::InvalidApiKey),
        Some(_) => Ok(()),
    }
}

/// The request must declare a JSON content type.
fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let declares_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

    if declares_json {
        Ok(())
    } else {
        Err(ApiError::InvalidContentType)
    }
}

/// Recompute the HMAC over the raw body and compare in constant time.
/// Active only when a shared secret is configured.
fn check_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let Some(secret) = &state.config.hmac_secret else {
        return Ok(());
    };

    let Some(signature) = header_str(headers, "x-hub-signature-256") else {
        return Err(ApiError::MissingSignature);
    };

    if signing::verify_signature(secret, body, signature) {
        Ok(())
    } else {
        Err(ApiError::InvalidSignature)
    }
}

/// Validate the body: a JSON object with non-empty `event_type` (one of
/// the known kinds) and `admission_number`.
fn parse_event(body: &[u8]) -> Result<WebhookEvent, ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyPayload);
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;

    let object = value
        .as_object()
        .ok_or_else(|| ApiError::InvalidPayload("body must be a JSON object".into()))?;

    let event_type = object
        .get("event_type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let admission_number = object
        .get("admission_number")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    if event_type.is_empty() || admission_number.is_empty() {
        return Err(ApiError::InvalidPayload(
            "event_type and admission_number are required".into(),
        ));
    }

    let kind = ChangeKind::parse(event_type)
        .ok_or_else(|| ApiError::InvalidEventType(event_type.to_string()))?;
    let admission_number = admission_number.to_string();

    Ok(WebhookEvent {
        kind,
        admission_number,
        payload: value,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Mount the webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(receive))
        .route("/webhook/retry", post(receive_retry))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
