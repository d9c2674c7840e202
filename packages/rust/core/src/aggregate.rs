//! Signal aggregation: merge records from every source and deduplicate by term.

use std::collections::HashMap;

use tracing::{debug, instrument};

use seocontext_shared::{SignalCandidate, SignalRecord, normalize_term};

/// Merge signal records into one candidate per normalized term.
///
/// The aggregator:
/// 1. Orders records by source priority (stable, so per-source order is kept)
/// 2. Case-folds each term and drops empty ones
/// 3. Groups by folded term in first-seen order
/// 4. Unions metrics, keeping the first value seen for any metric name
///
/// Empty input yields an empty list.
#[instrument(skip_all)]
pub fn aggregate<I>(records: I) -> Vec<SignalCandidate>
where
    I: IntoIterator<Item = SignalRecord>,
{
    let mut records: Vec<SignalRecord> = records.into_iter().collect();
    records.sort_by_key(|r| r.source.priority());

    let total = records.len();
    let mut candidates: Vec<SignalCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = 0usize;

    for record in records {
        let term = normalize_term(&record.term);
        if term.is_empty() {
            dropped += 1;
            continue;
        }

        match index.get(&term) {
            Some(&i) => {
                let candidate = &mut candidates[i];
                if !candidate.contributing_sources.contains(&record.source) {
                    candidate.contributing_sources.push(record.source);
                }
                candidate.metrics.merge_missing(&record.metrics);
                candidate.raw.push(record.raw);
            }
            None => {
                index.insert(term.clone(), candidates.len());
                candidates.push(SignalCandidate {
                    term,
                    contributing_sources: vec![record.source],
                    metrics: record.metrics,
                    raw: vec![record.raw],
                });
            }
        }
    }

    debug!(
        records = total,
        dropped,
        candidates = candidates.len(),
        "signals aggregated"
    );

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use seocontext_shared::{SourceKind, metric};

    fn record(term: &str, source: SourceKind) -> SignalRecord {
        SignalRecord::new(term, source)
    }

    #[test]
    fn case_and_whitespace_variants_merge() {
        let candidates = aggregate(vec![
            record("Shoes", SourceKind::Analytics),
            record("shoes ", SourceKind::SearchConsole),
        ]);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].term, "shoes");
        assert_eq!(
            candidates[0].contributing_sources,
            vec![SourceKind::Analytics, SourceKind::SearchConsole]
        );
        assert_eq!(candidates[0].raw.len(), 2);
    }

    #[test]
    fn empty_terms_are_dropped() {
        let candidates = aggregate(vec![
            record("   ", SourceKind::Analytics),
            record("", SourceKind::TrendService),
            record("boots", SourceKind::TrendService),
        ]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].term, "boots");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn first_metric_by_source_priority_wins() {
        // Arrives trend-first; analytics still has priority for the shared field.
        let candidates = aggregate(vec![
            record("sage cooker", SourceKind::TrendService)
                .with_metric(metric::VALUE, 80.0)
                .with_metric(metric::SESSIONS, 1.0),
            record("Sage Cooker", SourceKind::Analytics)
                .with_metric(metric::SESSIONS, 980.0)
                .with_metric(metric::CONVERSIONS, 58.0),
        ]);

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.metrics.get(metric::SESSIONS), 980.0);
        assert_eq!(c.metrics.get(metric::VALUE), 80.0);
        assert_eq!(
            c.contributing_sources,
            vec![SourceKind::Analytics, SourceKind::TrendService]
        );
    }

    #[test]
    fn duplicate_within_one_source_keeps_first_values() {
        let candidates = aggregate(vec![
            record("shoes", SourceKind::SearchConsole).with_metric(metric::CLICKS, 10.0),
            record("SHOES", SourceKind::SearchConsole).with_metric(metric::CLICKS, 99.0),
        ]);
        assert_eq!(candidates[0].metrics.get(metric::CLICKS), 10.0);
        assert_eq!(candidates[0].contributing_sources, vec![SourceKind::SearchConsole]);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let candidates = aggregate(vec![
            record("b", SourceKind::Analytics),
            record("a", SourceKind::Analytics),
            record("c", SourceKind::SearchConsole),
            record("a", SourceKind::SearchConsole),
        ]);
        let terms: Vec<&str> = candidates.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec!["b", "a", "c"]);
    }
}
