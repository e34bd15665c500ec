//! `rollcall-api` library crate.
//!
//! The inbound webhook receiver: authenticates, validates, and
//! deduplicates events pushed by a (possibly remote) roster producer, then
//! hands them to a registered listener. Re-exports internal modules for
//! integration testing; the server entrypoint lives in `main.rs`.

pub mod config;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod router;
pub mod routes;
pub mod state;
