//! Analysis stage.
//!
//! Each analysis reads the collected source payloads (and earlier analyses)
//! from the run store and produces one typed output. Analyses run in the
//! order returned by [`default_analyses`]; a failing analysis is logged and
//! left out of the store without stopping the ones after it.

mod competitors;
mod content;
mod keywords;
mod pricing;

use async_trait::async_trait;

use seocontext_shared::{Product, Result};

use crate::store::{RunResultStore, StageKey, StageOutput};

pub use competitors::{CompetitorAnalysis, CompetitorAnalyzer, CompetitorPricing};
pub use content::{ContentOptimization, ContentOptimizer};
pub use keywords::{KeywordAnalysis, KeywordAnalyzer, analyze_keywords};
pub use pricing::{PriceAnalyzer, PriceIntelligence};

/// One step of the analysis stage.
#[async_trait]
pub trait Analysis: Send + Sync {
    /// Store slot this analysis writes.
    fn key(&self) -> StageKey;

    /// Derive this analysis' output from the product and what the store holds so far.
    async fn run(&self, product: &Product, store: &RunResultStore) -> Result<StageOutput>;
}

/// The built-in analyses, in run order. Content optimization reads the
/// keyword and competitor results, so it runs last.
pub fn default_analyses() -> Vec<Box<dyn Analysis>> {
    vec![
        Box::new(KeywordAnalyzer),
        Box::new(CompetitorAnalyzer),
        Box::new(PriceAnalyzer),
        Box::new(ContentOptimizer),
    ]
}

/// Comma-joined list used inside recommendation sentences.
fn join_terms<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
