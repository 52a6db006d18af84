//! Render error types.

/// Why a render failed.
///
/// Cloneable so one shared render can hand its failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to start browser session: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Failed to extract rendered content: {0}")]
    Extraction(String),
}

impl RenderError {
    /// Short failure tag, used in diagnostic headers and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Launch(_) => "launch",
            Self::Navigation(_) => "navigation",
            Self::Timeout { .. } => "timeout",
            Self::Extraction(_) => "extraction",
        }
    }
}
