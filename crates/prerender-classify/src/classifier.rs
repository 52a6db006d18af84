//! Request classifier.

use http::Method;
use prerender_core::{Classification, GatewayConfig};

use crate::signatures::{BotSignatures, ClassifyError};
use crate::skip::SkipRules;

/// Decides how the gateway handles a request.
///
/// Classification is a pure, total function of the method, path, user-agent
/// and accept header.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    skip: SkipRules,
    bots: BotSignatures,
}

impl RequestClassifier {
    /// Create a classifier from explicit rules.
    pub fn new(skip: SkipRules, bots: BotSignatures) -> Self {
        Self { skip, bots }
    }

    /// Build a classifier from gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ClassifyError> {
        Ok(Self {
            skip: SkipRules::from_config(&config.skip),
            bots: BotSignatures::from_patterns(&config.bots.signatures)?,
        })
    }

    /// Classify a request.
    pub fn classify(
        &self,
        method: &Method,
        path: &str,
        user_agent: &str,
        accept: &str,
    ) -> Classification {
        if *method != Method::GET && *method != Method::HEAD {
            return Classification::PassThrough;
        }

        if self.skip.is_skipped(path) {
            return Classification::Skip;
        }

        if likely_html(method, accept) && self.bots.matches(user_agent) {
            Classification::Bot
        } else {
            Classification::Human
        }
    }

    /// The signature a user-agent matched, for logging.
    pub fn matched_signature(&self, user_agent: &str) -> Option<&str> {
        self.bots.first_match(user_agent)
    }

    /// Bot signatures in use.
    pub fn signatures(&self) -> &BotSignatures {
        &self.bots
    }
}

/// Whether a response to this request is likely to be HTML.
///
/// True for an empty Accept, an Accept containing `text/html` or `*/*`, and
/// for every HEAD request.
pub fn likely_html(method: &Method, accept: &str) -> bool {
    accept.is_empty()
        || accept.contains("text/html")
        || accept.contains("*/*")
        || *method == Method::HEAD
}
