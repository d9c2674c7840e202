//! Source-weighted scoring and ranking of aggregated signals.
//!
//! The multipliers are a fixed business rule. Conversions are worth twice a
//! click and clicks far more than impressions; changing any of them changes
//! ranked output.

use tracing::instrument;

use seocontext_shared::{AggregatedSignal, SignalCandidate, SourceKind, metric};

use crate::intent;

/// Length of the ranked keyword list exposed in the product context.
pub const TOP_KEYWORDS: usize = 15;

const CLICK_WEIGHT: f64 = 5.0;
const IMPRESSION_WEIGHT: f64 = 0.1;
const CONVERSION_WEIGHT: f64 = 10.0;
const SESSION_WEIGHT: f64 = 1.0;
const RISING_TREND_WEIGHT: f64 = 0.5;
const TREND_WEIGHT: f64 = 0.1;

/// One source's share of a candidate's score. Missing metrics count as 0.
pub fn source_contribution(source: SourceKind, candidate: &SignalCandidate) -> f64 {
    let m = &candidate.metrics;
    match source {
        SourceKind::SearchConsole => {
            m.get(metric::CLICKS) * CLICK_WEIGHT + m.get(metric::IMPRESSIONS) * IMPRESSION_WEIGHT
        }
        SourceKind::Analytics => {
            m.get(metric::CONVERSIONS) * CONVERSION_WEIGHT + m.get(metric::SESSIONS) * SESSION_WEIGHT
        }
        SourceKind::TrendService => {
            let weight = if m.get(metric::RISING) > 0.0 {
                RISING_TREND_WEIGHT
            } else {
                TREND_WEIGHT
            };
            m.get(metric::VALUE) * weight
        }
        SourceKind::CompetitorDb | SourceKind::RawRelated => 0.0,
    }
}

/// Sum of every contributing source's share.
pub fn score(candidate: &SignalCandidate) -> f64 {
    candidate
        .contributing_sources
        .iter()
        .map(|&source| source_contribution(source, candidate))
        .sum()
}

/// Score and classify every candidate, then sort by score descending.
///
/// The sort is stable: equal scores keep their first-seen order. The full
/// list is returned; truncation belongs to the caller.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub fn rank(candidates: Vec<SignalCandidate>) -> Vec<AggregatedSignal> {
    let mut signals: Vec<AggregatedSignal> = candidates
        .into_iter()
        .map(|candidate| AggregatedSignal {
            score: score(&candidate),
            intent: intent::classify(&candidate),
            term: candidate.term,
            contributing_sources: candidate.contributing_sources,
            metrics: candidate.metrics,
        })
        .collect();

    signals.sort_by(|a, b| b.score.total_cmp(&a.score));
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use seocontext_shared::{Intent, Metrics};

    fn candidate(term: &str, sources: &[SourceKind], metrics: &[(&str, f64)]) -> SignalCandidate {
        SignalCandidate {
            term: term.into(),
            contributing_sources: sources.to_vec(),
            metrics: metrics.iter().copied().collect::<Metrics>(),
            raw: Vec::new(),
        }
    }

    #[test]
    fn combined_analytics_and_search_console_score() {
        let c = candidate(
            "sage cooker",
            &[SourceKind::Analytics, SourceKind::SearchConsole],
            &[
                (metric::SESSIONS, 980.0),
                (metric::CONVERSIONS, 58.0),
                (metric::CLICKS, 40.0),
                (metric::IMPRESSIONS, 500.0),
            ],
        );
        assert!((score(&c) - 1810.0).abs() < 1e-9);
    }

    #[test]
    fn trend_weights_depend_on_rising_flag() {
        let top = candidate("a", &[SourceKind::TrendService], &[(metric::VALUE, 100.0)]);
        let rising = candidate(
            "b",
            &[SourceKind::TrendService],
            &[(metric::VALUE, 100.0), (metric::RISING, 1.0)],
        );
        assert!((score(&top) - 10.0).abs() < 1e-9);
        assert!((score(&rising) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn reserved_sources_contribute_nothing() {
        let c = candidate(
            "sage cooker",
            &[SourceKind::CompetitorDb, SourceKind::RawRelated],
            &[(metric::SEARCH_VOLUME, 5000.0), (metric::CLICKS, 100.0)],
        );
        assert_eq!(score(&c), 0.0);
    }

    #[test]
    fn conversions_rank_higher() {
        let ranked = rank(vec![
            candidate("a", &[SourceKind::Analytics], &[(metric::CONVERSIONS, 0.0), (metric::SESSIONS, 3.0)]),
            candidate("b", &[SourceKind::Analytics], &[(metric::CONVERSIONS, 10.0), (metric::SESSIONS, 3.0)]),
        ]);
        assert_eq!(ranked[0].term, "b");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let ranked = rank(vec![
            candidate("low", &[SourceKind::SearchConsole], &[(metric::CLICKS, 1.0)]),
            candidate("first", &[SourceKind::SearchConsole], &[(metric::CLICKS, 4.0)]),
            candidate("second", &[SourceKind::Analytics], &[(metric::SESSIONS, 20.0)]),
            candidate("third", &[SourceKind::SearchConsole], &[(metric::IMPRESSIONS, 200.0)]),
        ]);
        let terms: Vec<&str> = ranked.iter().map(|s| s.term.as_str()).collect();
        assert_eq!(terms, vec!["first", "second", "third", "low"]);
    }

    #[test]
    fn rank_returns_everything_with_intent() {
        let candidates: Vec<SignalCandidate> = (0..20)
            .map(|i| candidate(&format!("buy {i}"), &[SourceKind::SearchConsole], &[(metric::CLICKS, i as f64)]))
            .collect();
        let ranked = rank(candidates);
        assert_eq!(ranked.len(), 20);
        assert_eq!(ranked[0].term, "buy 19");
        assert!(ranked.iter().all(|s| s.intent == Intent::Transactional));
    }
}
