//! Crawler user-agent signatures.

use regex::{Regex, RegexBuilder};

/// Errors from signature compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifyError {
    #[error("invalid bot signature '{pattern}': {reason}")]
    InvalidSignature { pattern: String, reason: String },
}

/// An ordered list of case-insensitive crawler user-agent patterns.
///
/// Immutable once built; inject a custom list for tests or deployments that
/// track a different set of crawlers.
#[derive(Debug, Clone)]
pub struct BotSignatures {
    patterns: Vec<Regex>,
}

impl BotSignatures {
    /// Compile signatures from regular expression sources, keeping their order.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ClassifyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|source| {
                let source = source.as_ref();
                RegexBuilder::new(source)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ClassifyError::InvalidSignature {
                        pattern: source.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Whether any signature matches the user-agent.
    pub fn matches(&self, user_agent: &str) -> bool {
        self.first_match(user_agent).is_some()
    }

    /// The first signature, in list order, that matches the user-agent.
    ///
    /// An empty user-agent is matched like any other string.
    pub fn first_match(&self, user_agent: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|re| re.is_match(user_agent))
            .map(|re| re.as_str())
    }

    /// Pattern sources, in evaluation order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|re| re.as_str())
    }

    /// Number of signatures.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
