//! Core types, constants, and pure logic for the roster synchronization
//! pipeline.
//!
//! This crate has zero internal dependencies (no HTTP, no async, no
//! spreadsheet I/O). It provides:
//!
//! - [`learner`] — the learner record value type, key normalization, and
//!   record-level validation.
//! - [`snapshot`] — the deduplicated file snapshot and the cheap
//!   `(modified, size)` change fingerprint.
//! - [`dates`] — best-effort date normalization to `YYYY-MM-DD`.
//! - [`diff`] — snapshot comparison producing ordered change events and a
//!   per-pass summary.
//! - [`signing`] — HMAC-SHA256 webhook signing and constant-time
//!   verification.
//! - [`idempotency`] — bounded TTL duplicate cache and retry counter used
//!   by the webhook receiver.
//! - [`collab`] — interfaces for the external collaborators (authorization,
//!   persistence, notification).

pub mod collab;
pub mod dates;
pub mod diff;
pub mod error;
pub mod idempotency;
pub mod learner;
pub mod signing;
pub mod snapshot;

pub use diff::{diff_snapshots, ChangeEvent, ChangeKind, DiffOutcome, PassSummary};
pub use error::CoreError;
pub use learner::LearnerRecord;
pub use snapshot::{FileState, Snapshot};
