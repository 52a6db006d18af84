//! Request classification outcome.

use serde::{Deserialize, Serialize};

/// How the gateway treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Method is neither GET nor HEAD; forwarded verbatim.
    PassThrough,
    /// Path is on the skip list; forwarded verbatim, never rendered.
    Skip,
    /// Known crawler asking for HTML; served a rendered snapshot.
    Bot,
    /// Everyone else; forwarded to the origin.
    Human,
}

impl Classification {
    /// Whether this request goes through the cache and renderer.
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }

    /// Get the name of this classification.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass-through",
            Self::Skip => "skip",
            Self::Bot => "bot",
            Self::Human => "human",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
