//! Configuration source (retrieval) errors.

use crate::domains::ConfigDomain;

/// Errors raised while retrieving configuration text from the monitored
/// system. `Connectivity` aborts the whole run; `Query` and `Stale` are
/// domain-level and the run continues with the remaining domains.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Instance path does not contain the client profile marker.
    #[error("Instance directory is invalid.")]
    InstanceInvalid { path: String },

    /// Database name is absent from the catalog listing.
    #[error("database {database} is not cataloged")]
    DatabaseNotCataloged { database: String },

    /// Connectivity-class failure: the monitored system is unreachable.
    /// A mixed snapshot (some domains queried connected, others not) would
    /// be inconsistent, so the run escalates to unknown.
    #[error("cannot reach the instance: {message}")]
    Connectivity { message: String },

    /// Data-retrieval failure for a single domain.
    #[error("retrieval of {domain} failed: {message}")]
    Query { domain: ConfigDomain, message: String },

    /// Asynchronously produced policy file was not fresh within the window.
    #[error("{domain} file is too old")]
    Stale { domain: ConfigDomain },
}

impl SourceError {
    /// True for failures that must abort the remaining domain loop.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SourceError::Connectivity { .. })
    }
}
