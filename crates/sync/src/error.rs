use std::path::PathBuf;

/// Error type for monitor and dispatcher construction and startup.
///
/// These are the only errors this crate raises to callers: once running,
/// the pipeline handles lock contention, read failures, and delivery
/// failures internally (logged and retried, never propagated).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The webhook URL could not be parsed at construction time.
    #[error("Malformed webhook URL '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },

    /// The roster file path has no existing parent directory to watch.
    #[error("Roster file path is unresolvable: {0}")]
    UnresolvablePath(PathBuf),

    /// The OS directory watch could not be established.
    #[error("Failed to watch roster directory: {0}")]
    Watch(#[from] notify::Error),
}
