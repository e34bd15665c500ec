//! Outbound webhook delivery for change events.
//!
//! [`WebhookDispatcher`] signs and POSTs one JSON payload per
//! [`ChangeEvent`]. Delivery is fire-and-forget: the HTTP response is
//! observed and logged, but neither a non-2xx status nor a network error
//! ever reaches the caller — the detection pipeline's liveness must not
//! depend on a consumer's availability.

use std::net::IpAddr;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use rollcall_core::diff::ChangeEvent;
use rollcall_core::signing;

use crate::error::SyncError;

/// Value of the `X-Event-Source` header.
pub const EVENT_SOURCE: &str = "excel-file";

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("rollcall-sync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Destination endpoint, e.g. `http://host:8081/webhook`.
    pub url: String,
    /// Sent as `X-API-Key` on every delivery.
    pub api_key: String,
    /// Signing secret; `None` or empty disables the signature header.
    pub hmac_secret: Option<String>,
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The wire payload, owned exclusively until serialized.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event_type: &'static str,
    admission_number: &'a str,
    full_name: &'a str,
    grade_name: &'a str,
    date_joined_school: &'a str,
    gender: &'a str,
    status: &'a str,
    timestamp: String,
    source: &'static str,
}

impl<'a> WebhookPayload<'a> {
    fn from_event(event: &'a ChangeEvent) -> Self {
        Self {
            event_type: event.kind.as_str(),
            admission_number: &event.admission_number,
            full_name: &event.record.full_name,
            grade_name: &event.record.grade_name,
            date_joined_school: &event.record.date_joined,
            gender: &event.record.gender,
            status: &event.record.status,
            timestamp: Utc::now().to_rfc3339(),
            source: EVENT_SOURCE,
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookDispatcher
// ---------------------------------------------------------------------------

/// Delivers change events to the configured webhook endpoint.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: reqwest::Url,
    api_key: String,
    hmac_secret: Option<String>,
    loopback: bool,
}

impl WebhookDispatcher {
    /// Build a dispatcher, validating the destination URL up front.
    ///
    /// A malformed URL is a configuration error and fails construction —
    /// the component must not enter a partially-configured running state.
    /// An empty HMAC secret disables signing entirely.
    pub fn new(config: DispatcherConfig) -> Result<Self, SyncError> {
        let url =
            reqwest::Url::parse(&config.url).map_err(|e| SyncError::InvalidWebhookUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        let loopback = url.host_str().is_some_and(is_loopback_host);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build reqwest HTTP client");

        let hmac_secret = config.hmac_secret.filter(|s| !s.is_empty());

        Ok(Self {
            client,
            url,
            api_key: config.api_key,
            hmac_secret,
            loopback,
        })
    }

    /// Whether deliveries are suppressed because the destination is local.
    pub fn is_loopback(&self) -> bool {
        self.loopback
    }

    /// Deliver one change event.
    ///
    /// Loopback destinations are skipped entirely (the consumer shares our
    /// process and already observes the events). All failures are logged
    /// and swallowed; there is no retry.
    pub async fn dispatch(&self, event: &ChangeEvent) {
        if self.loopback {
            tracing::debug!(
                event_type = %event.kind,
                admission_number = %event.admission_number,
                "Skipping webhook delivery to loopback consumer"
            );
            return;
        }

        let payload = WebhookPayload::from_event(event);
        let body =
            serde_json::to_string(&payload).expect("WebhookPayload is always serialisable");

        let mut request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.api_key)
            .header("X-Event-Source", EVENT_SOURCE)
            .header("Idempotency-Key", uuid::Uuid::new_v4().to_string());

        if let Some(secret) = &self.hmac_secret {
            request = request.header(
                "X-Hub-Signature-256",
                signing::sign_payload(secret, body.as_bytes()),
            );
        }

        match request.body(body).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    event_type = %event.kind,
                    admission_number = %event.admission_number,
                    status = response.status().as_u16(),
                    "Webhook delivered"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    event_type = %event.kind,
                    admission_number = %event.admission_number,
                    status = response.status().as_u16(),
                    "Webhook consumer returned non-success status"
                );
            }
            Err(e) => {
                tracing::warn!(
                    event_type = %event.kind,
                    admission_number = %event.admission_number,
                    error = %e,
                    "Webhook delivery failed"
                );
            }
        }
    }
}

/// Whether a URL host refers to the local machine.
fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
