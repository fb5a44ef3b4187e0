//! Error handling for the drift check.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod check_error;
pub mod config_error;
pub mod lock_error;
pub mod source_error;
pub mod store_error;

pub use check_error::CheckError;
pub use config_error::ConfigError;
pub use lock_error::LockError;
pub use source_error::SourceError;
pub use store_error::StoreError;
