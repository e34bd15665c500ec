//! Interfaces for the external collaborators the pipeline talks to.
//!
//! The persistence layer, authorization service, and GUI notification
//! surface are owned by the wider application; this crate only defines the
//! seams. Implementations are injected into the monitor and receiver
//! rather than read from ambient global state.

use crate::diff::ChangeEvent;
use crate::error::CoreError;

/// Decides whether the current actor may trigger an import.
///
/// A negative answer must be treated as a silent no-op by the caller: an
/// unauthorized actor must not learn whether the source file changed.
pub trait ImportAuthorizer: Send + Sync {
    fn can_import(&self) -> bool;

    /// Audit callback, invoked for every decision (allowed or not).
    fn record_attempt(&self, allowed: bool);
}

/// Commits a batch of change events to the learner store.
///
/// Implementations must be transactional (all-or-nothing per batch) and
/// idempotent on the admission-number natural key, since delivery is
/// at-least-once.
pub trait ChangeSink: Send + Sync {
    fn apply_changes(&self, changes: &[ChangeEvent]) -> Result<(), CoreError>;
}

/// Receives human-readable title/message pairs for the GUI surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Authorizer that admits every import. Used by binaries where
/// authorization is enforced upstream of the pipeline.
pub struct OpenGate;

impl ImportAuthorizer for OpenGate {
    fn can_import(&self) -> bool {
        true
    }

    fn record_attempt(&self, _allowed: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_gate_always_admits() {
        let gate = OpenGate;
        assert!(gate.can_import());
        gate.record_attempt(true);
    }
}
