//! Rule-based search intent classification.

use serde::Serialize;

use seocontext_shared::{AggregatedSignal, Intent, SignalCandidate, SourceKind, metric};

/// Purchase vocabulary. Checked first.
const TRANSACTIONAL_WORDS: [&str; 5] = ["buy", "price", "discount", "sale", "shop"];

/// Research vocabulary. Checked second.
const INFORMATIONAL_WORDS: [&str; 5] = ["how", "what", "why", "guide", "tutorial"];

/// Analytics sessions above this mark a term as navigational.
const NAVIGATIONAL_MIN_SESSIONS: f64 = 5.0;

/// Maximum members per bucket in the grouped view.
pub const GROUP_LIMIT: usize = 10;

/// Classify one candidate. Rules run in order and the first match wins:
/// transactional words, informational words, analytics sessions, unknown.
///
/// Matching is substring-based on the case-folded term.
pub fn classify(candidate: &SignalCandidate) -> Intent {
    let term = candidate.term.as_str();

    if TRANSACTIONAL_WORDS.iter().any(|w| term.contains(w)) {
        return Intent::Transactional;
    }
    if INFORMATIONAL_WORDS.iter().any(|w| term.contains(w)) {
        return Intent::Informational;
    }
    if candidate.has_source(SourceKind::Analytics)
        && candidate.metrics.get(metric::SESSIONS) > NAVIGATIONAL_MIN_SESSIONS
    {
        return Intent::Navigational;
    }
    Intent::Unknown
}

/// Terms bucketed by intent, each bucket capped at [`GROUP_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentGroups {
    pub informational: Vec<String>,
    pub navigational: Vec<String>,
    pub transactional: Vec<String>,
    pub unknown: Vec<String>,
}

impl IntentGroups {
    /// Bucket signals in their given order. Signals past a full bucket are
    /// left out of the view but keep their classification.
    pub fn from_signals(signals: &[AggregatedSignal]) -> Self {
        let mut groups = Self::default();
        for signal in signals {
            let bucket = groups.bucket_mut(signal.intent);
            if bucket.len() < GROUP_LIMIT {
                bucket.push(signal.term.clone());
            }
        }
        groups
    }

    pub fn bucket(&self, intent: Intent) -> &[String] {
        match intent {
            Intent::Informational => &self.informational,
            Intent::Navigational => &self.navigational,
            Intent::Transactional => &self.transactional,
            Intent::Unknown => &self.unknown,
        }
    }

    fn bucket_mut(&mut self, intent: Intent) -> &mut Vec<String> {
        match intent {
            Intent::Informational => &mut self.informational,
            Intent::Navigational => &mut self.navigational,
            Intent::Transactional => &mut self.transactional,
            Intent::Unknown => &mut self.unknown,
        }
    }
}
