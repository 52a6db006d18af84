//! Request lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::classification::Classification;

/// Lifecycle phases for a request.
///
/// Every request ends in exactly one of `Forwarded`, `HumanForwarded`,
/// `CacheHit`, `Rendered` or `FallbackServed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPhase {
    /// Request received, processing started.
    Received,
    /// Classifier has decided how to treat the request.
    Classified(Classification),
    /// PassThrough/Skip request forwarded verbatim.
    Forwarded,
    /// Human request forwarded to the origin.
    HumanForwarded,
    /// Bot request looking up the snapshot cache.
    BotLookup,
    /// Snapshot served from the cache.
    CacheHit,
    /// No snapshot cached; rendering required.
    CacheMiss,
    /// Browser rendering in progress.
    Rendering,
    /// Rendering succeeded; snapshot served and store scheduled.
    Rendered,
    /// Rendering failed; origin response served instead.
    FallbackServed,
}

impl RequestPhase {
    /// Stable name used for timing marks.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Classified(_) => "classified",
            Self::Forwarded => "forwarded",
            Self::HumanForwarded => "human_forwarded",
            Self::BotLookup => "bot_lookup",
            Self::CacheHit => "cache_hit",
            Self::CacheMiss => "cache_miss",
            Self::Rendering => "rendering",
            Self::Rendered => "rendered",
            Self::FallbackServed => "fallback_served",
        }
    }
}

/// Timing context for observability.
///
/// Each entered phase leaves a mark, so the time spent since a phase began can
/// be read back while the request is still running.
#[derive(Debug, Clone)]
pub struct TimingContext {
    marks: HashMap<&'static str, Instant>,
    phases: Vec<RequestPhase>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            marks: HashMap::new(),
            phases: vec![RequestPhase::Received],
        }
    }

    /// Enter a lifecycle phase, recording a mark under its name.
    pub fn enter(&mut self, phase: RequestPhase) {
        self.marks.insert(phase.name(), Instant::now());
        self.phases.push(phase);
    }

    /// Phases entered so far, in order.
    pub fn phases(&self) -> &[RequestPhase] {
        &self.phases
    }

    /// Time elapsed since `phase` was last entered.
    pub fn since(&self, phase: &RequestPhase) -> Option<Duration> {
        self.marks.get(phase.name()).map(Instant::elapsed)
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_tracks_phase_order() {
        let mut timing = TimingContext::new();
        timing.enter(RequestPhase::Classified(Classification::Bot));
        timing.enter(RequestPhase::BotLookup);
        timing.enter(RequestPhase::CacheHit);

        assert_eq!(
            timing.phases(),
            &[
                RequestPhase::Received,
                RequestPhase::Classified(Classification::Bot),
                RequestPhase::BotLookup,
                RequestPhase::CacheHit,
            ]
        );
    }

    #[test]
    fn test_since_requires_entered_phase() {
        let mut timing = TimingContext::new();
        assert!(timing.since(&RequestPhase::Rendering).is_none());
        timing.enter(RequestPhase::Rendering);
        assert!(timing.since(&RequestPhase::Rendering).is_some());
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RequestPhase::Classified(Classification::Human).name(), "classified");
        assert_eq!(RequestPhase::FallbackServed.name(), "fallback_served");
    }
}
