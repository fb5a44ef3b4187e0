//! Configuration errors.

/// Errors that can occur while loading or validating the check configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}
