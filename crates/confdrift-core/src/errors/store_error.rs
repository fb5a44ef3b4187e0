//! Snapshot store errors.

/// Errors that can occur in the snapshot store. A commit failure is fatal
/// for the whole run: an un-committed snapshot would make the next run diff
/// against stale state and silently hide real drift.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot store {path}: {message}")]
    Io { path: String, message: String },

    #[error("history file {path} is corrupt: {message}")]
    CorruptHistory { path: String, message: String },
}
