//! Path exclusions.

use std::collections::HashSet;

use prerender_core::SkipConfig;

/// Paths the gateway never renders or caches.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl SkipRules {
    /// Create empty rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build rules from configuration.
    pub fn from_config(config: &SkipConfig) -> Self {
        let rules = config
            .exact
            .iter()
            .fold(Self::new(), |rules, path| rules.skip_exact(path.as_str()));
        config
            .prefixes
            .iter()
            .fold(rules, |rules, prefix| rules.skip_prefix(prefix.as_str()))
    }

    /// Skip an exact path.
    pub fn skip_exact(mut self, path: impl Into<String>) -> Self {
        self.exact.insert(path.into());
        self
    }

    /// Skip every path starting with a prefix.
    pub fn skip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Check whether a path is excluded. Matching is case-sensitive and
    /// byte-wise; `/api` also covers `/apis` and `/api-docs`.
    pub fn is_skipped(&self, path: &str) -> bool {
        if self.exact.contains(path) {
            return true;
        }
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}
