//! Core error types.

/// Errors raised while building core values or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
