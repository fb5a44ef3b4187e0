//! Top-level check errors.
//! Aggregates subsystem errors via `From` conversions; every variant maps
//! to Nagios unknown (exit 3).

use super::{ConfigError, LockError, SourceError, StoreError};

/// Fatal errors for a whole run. Non-fatal domain failures are collected in
/// the run result instead (see `report::RunResult`).
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Lock(#[from] LockError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Usage(String),
}
