//! Execution lock errors.

/// Errors that can occur while acquiring or releasing the execution lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another live process holds the lock for this invocation signature.
    #[error("another check with the same parameters is already running (pid {owner_pid})")]
    Busy { signature: String, owner_pid: u32 },

    #[error("lock file {path}: {message}")]
    Io { path: String, message: String },

    #[error("lock file {path} is malformed: {content:?}")]
    Malformed { path: String, content: String },
}
