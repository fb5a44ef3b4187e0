//! Core types for the configuration drift check: the 11 tracked
//! configuration domains, the monitored target, per-run verdicts and
//! alert aggregation, layered configuration, and the error taxonomy.

pub mod config;
pub mod domains;
pub mod errors;
pub mod report;
pub mod target;

pub use config::{CheckConfig, CliOverrides};
pub use domains::ConfigDomain;
pub use errors::{CheckError, ConfigError, LockError, SourceError, StoreError};
pub use report::{aggregate, AlertResult, DriftVerdict, RunResult, Severity};
pub use target::Target;
