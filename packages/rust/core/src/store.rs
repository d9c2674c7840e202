//! Per-run result store: one typed, write-once slot per collection source and analysis.

use serde::Serialize;

use seocontext_shared::{Result, SeoContextError, SignalRecord, SourceId};
use seocontext_sources::{
    AnalyticsReport, CompetitorDbReport, MerchantReport, SearchConsoleReport, SourcePayload,
    TrendReport, WebCrawlReport,
};

use crate::analysis::{CompetitorAnalysis, ContentOptimization, KeywordAnalysis, PriceIntelligence};

// ---------------------------------------------------------------------------
// Keys and outputs
// ---------------------------------------------------------------------------

/// Name of a stage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKey {
    Source(SourceId),
    KeywordAnalysis,
    CompetitorAnalysis,
    PriceIntelligence,
    ContentOptimization,
}

impl StageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source(id) => id.as_str(),
            Self::KeywordAnalysis => "keyword_analysis",
            Self::CompetitorAnalysis => "competitor_analysis",
            Self::PriceIntelligence => "price_intelligence",
            Self::ContentOptimization => "content_optimization",
        }
    }
}

impl std::fmt::Display for StageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage wrote.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageOutput {
    Source(SourcePayload),
    Keywords(KeywordAnalysis),
    Competitors(CompetitorAnalysis),
    Pricing(PriceIntelligence),
    Content(ContentOptimization),
}

impl StageOutput {
    pub fn key(&self) -> StageKey {
        match self {
            Self::Source(payload) => StageKey::Source(payload.source_id()),
            Self::Keywords(_) => StageKey::KeywordAnalysis,
            Self::Competitors(_) => StageKey::CompetitorAnalysis,
            Self::Pricing(_) => StageKey::PriceIntelligence,
            Self::Content(_) => StageKey::ContentOptimization,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Results of one product run, in insertion order.
///
/// Slots are written once. Readers only ever get shared references, so a
/// slot cannot change after it is written.
#[derive(Debug, Default)]
pub struct RunResultStore {
    entries: Vec<(StageKey, StageOutput)>,
}

impl RunResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a stage result. Writing the same key twice is an error.
    pub fn insert(&mut self, output: StageOutput) -> Result<()> {
        let key = output.key();
        if self.contains(key) {
            return Err(SeoContextError::StageConflict {
                key: key.as_str().to_string(),
            });
        }
        self.entries.push((key, output));
        Ok(())
    }

    pub fn contains(&self, key: StageKey) -> bool {
        self.entries.iter().any(|(k, _)| *k == key)
    }

    pub fn get(&self, key: StageKey) -> Option<&StageOutput> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, output)| output)
    }

    /// Populated keys in insertion order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All collected source payloads, in insertion order.
    pub fn source_payloads(&self) -> impl Iterator<Item = &SourcePayload> {
        self.entries.iter().filter_map(|(_, output)| match output {
            StageOutput::Source(payload) => Some(payload),
            _ => None,
        })
    }

    /// Signal records from every collected source.
    pub fn signal_records(&self) -> Vec<SignalRecord> {
        self.source_payloads()
            .flat_map(SourcePayload::signal_records)
            .collect()
    }

    fn source(&self, id: SourceId) -> Option<&SourcePayload> {
        match self.get(StageKey::Source(id))? {
            StageOutput::Source(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn analytics(&self) -> Option<&AnalyticsReport> {
        match self.source(SourceId::Analytics)? {
            SourcePayload::Analytics(r) => Some(r),
            _ => None,
        }
    }

    pub fn search_console(&self) -> Option<&SearchConsoleReport> {
        match self.source(SourceId::SearchConsole)? {
            SourcePayload::SearchConsole(r) => Some(r),
            _ => None,
        }
    }

    pub fn merchant(&self) -> Option<&MerchantReport> {
        match self.source(SourceId::MerchantCenter)? {
            SourcePayload::MerchantCenter(r) => Some(r),
            _ => None,
        }
    }

    pub fn competitor_db(&self) -> Option<&CompetitorDbReport> {
        match self.source(SourceId::CompetitorDb)? {
            SourcePayload::CompetitorDb(r) => Some(r),
            _ => None,
        }
    }

    pub fn trends(&self) -> Option<&TrendReport> {
        match self.source(SourceId::TrendService)? {
            SourcePayload::TrendService(r) => Some(r),
            _ => None,
        }
    }

    pub fn web_crawl(&self) -> Option<&WebCrawlReport> {
        match self.source(SourceId::WebCrawl)? {
            SourcePayload::WebCrawl(r) => Some(r),
            _ => None,
        }
    }

    pub fn keyword_analysis(&self) -> Option<&KeywordAnalysis> {
        match self.get(StageKey::KeywordAnalysis)? {
            StageOutput::Keywords(a) => Some(a),
            _ => None,
        }
    }

    pub fn competitor_analysis(&self) -> Option<&CompetitorAnalysis> {
        match self.get(StageKey::CompetitorAnalysis)? {
            StageOutput::Competitors(a) => Some(a),
            _ => None,
        }
    }

    pub fn price_intelligence(&self) -> Option<&PriceIntelligence> {
        match self.get(StageKey::PriceIntelligence)? {
            StageOutput::Pricing(a) => Some(a),
            _ => None,
        }
    }

    pub fn content_optimization(&self) -> Option<&ContentOptimization> {
        match self.get(StageKey::ContentOptimization)? {
            StageOutput::Content(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(id: SourceId, raw: serde_json::Value) -> StageOutput {
        StageOutput::Source(SourcePayload::parse(id, &raw).expect("valid payload"))
    }

    #[test]
    fn keys_follow_insertion_order() {
        let mut store = RunResultStore::new();
        store
            .insert(payload(
                SourceId::SearchConsole,
                json!({"search_data": {"queries": [{"query": "q", "impressions": 1}]}}),
            ))
            .expect("insert");
        store
            .insert(payload(
                SourceId::Analytics,
                json!({"brand_keywords": {"keywords": [{"term": "t", "sessions": 1}]}}),
            ))
            .expect("insert");
        store
            .insert(StageOutput::Keywords(KeywordAnalysis::default()))
            .expect("insert");

        assert_eq!(store.keys(), vec!["search_console", "analytics", "keyword_analysis"]);
        assert!(store.analytics().is_some());
        assert!(store.trends().is_none());
        assert_eq!(store.signal_records().len(), 2);
    }

    #[test]
    fn second_write_is_rejected() {
        let mut store = RunResultStore::new();
        store
            .insert(StageOutput::Keywords(KeywordAnalysis::default()))
            .expect("first write");
        let err = store
            .insert(StageOutput::Keywords(KeywordAnalysis::default()))
            .unwrap_err();

        assert!(matches!(err, SeoContextError::StageConflict { .. }));
        assert_eq!(store.len(), 1);
    }
}
