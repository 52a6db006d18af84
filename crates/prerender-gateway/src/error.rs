//! Gateway error types.

use prerender_classify::ClassifyError;
use prerender_core::CoreError;
use prerender_origin::FetchError;

/// Errors that reach the host.
///
/// Once built, the gateway only fails a request when the origin cannot be
/// reached; rendering and cache failures are absorbed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Origin unreachable: {0}")]
    Origin(#[from] FetchError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] CoreError),

    #[error("Invalid bot signatures: {0}")]
    Signatures(#[from] ClassifyError),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl GatewayError {
    /// Whether this error came from the origin fetch.
    pub fn is_origin(&self) -> bool {
        matches!(self, Self::Origin(_))
    }
}
