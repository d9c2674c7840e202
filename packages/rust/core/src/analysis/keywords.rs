use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use seocontext_shared::{AggregatedSignal, Product, Result, SignalRecord, SourceKind, metric};

use super::{Analysis, join_terms};
use crate::aggregate::aggregate;
use crate::intent::IntentGroups;
use crate::ranking::rank;
use crate::store::{RunResultStore, StageKey, StageOutput};

const PRIORITY_KEYWORDS: usize = 5;
const LOW_CTR_WINDOW: usize = 20;
const LOW_CTR_THRESHOLD: f64 = 1.0;
const CONVERTING_WINDOW: usize = 10;
const HIGH_CONVERSION_RATE: f64 = 5.0;

/// Aggregated, ranked and classified keyword signals for one product.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordAnalysis {
    /// Distinct terms after deduplication.
    pub combined_count: usize,
    pub groups: IntentGroups,
    /// Full ranked list, highest score first.
    pub ranked: Vec<AggregatedSignal>,
    pub recommendations: Vec<String>,
}

impl KeywordAnalysis {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Aggregate, rank and classify a product's signal records.
#[instrument(skip_all, fields(records = records.len()))]
pub fn analyze_keywords(records: Vec<SignalRecord>) -> KeywordAnalysis {
    let ranked = rank(aggregate(records));
    let groups = IntentGroups::from_signals(&ranked);
    let recommendations = recommendations(&ranked);

    debug!(terms = ranked.len(), "keywords ranked");

    KeywordAnalysis {
        combined_count: ranked.len(),
        groups,
        ranked,
        recommendations,
    }
}

fn recommendations(ranked: &[AggregatedSignal]) -> Vec<String> {
    let mut recs = Vec::new();

    let top: Vec<&str> = ranked
        .iter()
        .take(PRIORITY_KEYWORDS)
        .map(|s| s.term.as_str())
        .collect();
    if !top.is_empty() {
        recs.push(format!(
            "Prioritize these top keywords in title and description: {}",
            join_terms(&top)
        ));
    }

    let low_ctr = ranked.iter().take(LOW_CTR_WINDOW).any(|s| {
        s.has_source(SourceKind::SearchConsole)
            && s.metrics
                .get_opt(metric::CTR)
                .is_some_and(|ctr| ctr < LOW_CTR_THRESHOLD)
    });
    if low_ctr {
        recs.push(
            "Improve meta descriptions and titles for low CTR queries found in Search Console."
                .to_string(),
        );
    }

    let converting: Vec<&str> = ranked
        .iter()
        .take(CONVERTING_WINDOW)
        .filter(|s| {
            s.has_source(SourceKind::Analytics)
                && s.metrics.get(metric::CONVERSION_RATE) > HIGH_CONVERSION_RATE
        })
        .map(|s| s.term.as_str())
        .collect();
    if !converting.is_empty() {
        recs.push(format!(
            "Focus on high-converting keywords from analytics: {}",
            join_terms(&converting)
        ));
    }

    recs
}

/// Runs [`analyze_keywords`] over every collected source.
pub struct KeywordAnalyzer;

#[async_trait]
impl Analysis for KeywordAnalyzer {
    fn key(&self) -> StageKey {
        StageKey::KeywordAnalysis
    }

    async fn run(&self, _product: &Product, store: &RunResultStore) -> Result<StageOutput> {
        Ok(StageOutput::Keywords(analyze_keywords(store.signal_records())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sc(term: &str, clicks: f64, ctr: f64) -> SignalRecord {
        SignalRecord::new(term, SourceKind::SearchConsole)
            .with_metric(metric::CLICKS, clicks)
            .with_metric(metric::CTR, ctr)
    }

    #[test]
    fn empty_records_give_empty_analysis() {
        let analysis = analyze_keywords(Vec::new());
        assert!(analysis.is_empty());
        assert_eq!(analysis.combined_count, 0);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn top_keywords_recommendation_lists_five() {
        let records = (1..=7).map(|i| sc(&format!("term {i}"), i as f64, 3.0)).collect();
        let analysis = analyze_keywords(records);

        assert_eq!(analysis.combined_count, 7);
        assert_eq!(
            analysis.recommendations,
            vec![
                "Prioritize these top keywords in title and description: term 7, term 6, term 5, term 4, term 3"
                    .to_string()
            ]
        );
    }

    #[test]
    fn low_ctr_and_converting_terms_add_recommendations() {
        let analysis = analyze_keywords(vec![
            sc("sage cooker", 4.0, 0.4),
            SignalRecord::new("slow cooker", SourceKind::Analytics)
                .with_metric(metric::SESSIONS, 100.0)
                .with_metric(metric::CONVERSION_RATE, 7.5),
        ]);

        assert_eq!(analysis.recommendations.len(), 3);
        assert!(analysis.recommendations[1].contains("low CTR queries"));
        assert_eq!(
            analysis.recommendations[2],
            "Focus on high-converting keywords from analytics: slow cooker"
        );
        assert_eq!(analysis.groups.navigational, vec!["slow cooker".to_string()]);
    }
}
