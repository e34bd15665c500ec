//! Event listener seam between the receiver and the application.
//!
//! Validated events are handed to a [`WebhookListener`] asynchronously —
//! the HTTP response does not wait for the listener to finish. The
//! listener is an explicit injected interface, not ambient global state.

use std::sync::Arc;

use rollcall_core::collab::ChangeSink;
use rollcall_core::diff::{ChangeEvent, ChangeKind};
use rollcall_core::learner::normalize_admission_number;
use rollcall_core::LearnerRecord;

/// A validated inbound webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub kind: ChangeKind,
    pub admission_number: String,
    /// The full JSON body as received (already validated as an object).
    pub payload: serde_json::Value,
}

impl WebhookEvent {
    /// Reconstruct a change event from the wire payload.
    ///
    /// Fields absent from the payload become empty strings; the sink's own
    /// validation decides what to do with partial records.
    pub fn to_change_event(&self) -> ChangeEvent {
        let field = |name: &str| {
            self.payload
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        ChangeEvent {
            kind: self.kind,
            admission_number: normalize_admission_number(&self.admission_number),
            record: LearnerRecord {
                admission_number: self.admission_number.clone(),
                full_name: field("full_name"),
                grade_name: field("grade_name"),
                date_joined: field("date_joined_school"),
                gender: field("gender"),
                status: field("status"),
            },
        }
    }
}

/// Receives each accepted event, after the HTTP response is produced.
pub trait WebhookListener: Send + Sync {
    fn on_event(&self, event: &WebhookEvent);
}

/// Listener that only logs. Default when no persistence is wired.
pub struct LogListener;

impl WebhookListener for LogListener {
    fn on_event(&self, event: &WebhookEvent) {
        tracing::info!(
            event_type = %event.kind,
            admission_number = %event.admission_number,
            "Webhook event received"
        );
    }
}

/// Listener that forwards each event to the persistence collaborator.
pub struct SinkListener {
    sink: Arc<dyn ChangeSink>,
}

impl SinkListener {
    pub fn new(sink: Arc<dyn ChangeSink>) -> Self {
        Self { sink }
    }
}

impl WebhookListener for SinkListener {
    fn on_event(&self, event: &WebhookEvent) {
        let change = event.to_change_event();
        if let Err(e) = self.sink.apply_changes(std::slice::from_ref(&change)) {
            tracing::error!(
                event_type = %event.kind,
                admission_number = %event.admission_number,
                error = %e,
                "Persistence rejected webhook event"
            );
        }
    }
}
