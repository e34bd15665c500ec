//! Roster file synchronization: change monitoring and webhook dispatch.
//!
//! This crate owns the producer half of the pipeline:
//!
//! - [`monitor::FileMonitor`] — watches the roster spreadsheet through a
//!   periodic poll and an OS directory notification, re-reads it when the
//!   `(modified, size)` fingerprint changes, diffs snapshots, and hands
//!   change events to the dispatcher.
//! - [`dispatcher::WebhookDispatcher`] — signs and POSTs each event to the
//!   configured consumer, never letting delivery failures stall detection.
//! - [`locking`] — lock-marker and shared-advisory-lock probes that treat a
//!   locked file as "busy", never as corruption.
//!
//! The binary entrypoint in `main.rs` runs the monitor standalone against a
//! remote receiver; the server binary embeds it in-process instead.

pub mod dispatcher;
pub mod error;
pub mod locking;
pub mod monitor;

pub use dispatcher::{DispatcherConfig, WebhookDispatcher};
pub use error::SyncError;
pub use monitor::{FileMonitor, LogNotifier, LogSink, MonitorConfig, MonitorStatus};
