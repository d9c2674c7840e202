use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;

use seocontext_shared::{Product, Result, SeoContextError, SourceKind, metric};
use seocontext_sources::SearchConsoleReport;

use super::{Analysis, CompetitorAnalysis, KeywordAnalysis, join_terms};
use crate::store::{RunResultStore, StageKey, StageOutput};

const TITLE_MIN_CHARS: usize = 50;
const TITLE_MAX_CHARS: usize = 60;
const CONVERTING_TERMS: usize = 3;
const CONVERTING_RATE: f64 = 2.0;
const LOW_CTR_QUERIES: usize = 3;
const COMPETITOR_KEYWORDS: usize = 5;

/// Title, description and on-page suggestions for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentOptimization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_keyword: Option<String>,
    pub title_suggestions: Vec<String>,
    pub description_suggestions: Vec<String>,
    pub other_suggestions: Vec<String>,
}

#[instrument(skip_all)]
pub fn optimize_content(
    product: &Product,
    keywords: &KeywordAnalysis,
    competitors: Option<&CompetitorAnalysis>,
    search: Option<&SearchConsoleReport>,
) -> ContentOptimization {
    let primary_keyword = keywords.ranked.first().map(|s| s.term.clone());

    ContentOptimization {
        title_suggestions: title_suggestions(product, keywords, primary_keyword.as_deref()),
        description_suggestions: description_suggestions(keywords, competitors, search),
        other_suggestions: other_suggestions(competitors),
        primary_keyword,
    }
}

fn title_suggestions(product: &Product, keywords: &KeywordAnalysis, primary: Option<&str>) -> Vec<String> {
    let mut recs = Vec::new();

    if let Some(primary) = primary {
        recs.push(format!("Include primary keyword '{primary}' early in the title."));
    }

    let title = product.title.as_deref().unwrap_or_default();
    if let Some(brand) = product.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        if title.to_lowercase().contains(&brand.to_lowercase()) {
            recs.push(format!("Keep brand name '{brand}' in the title."));
        } else {
            recs.push(format!("Add brand name '{brand}' to the title."));
        }
    }

    let converting: Vec<&str> = keywords
        .ranked
        .iter()
        .filter(|s| {
            s.has_source(SourceKind::Analytics)
                && s.metrics.get(metric::CONVERSION_RATE) > CONVERTING_RATE
        })
        .take(CONVERTING_TERMS)
        .map(|s| s.term.as_str())
        .collect();
    if !converting.is_empty() {
        recs.push(format!(
            "Consider incorporating high-converting terms like: {}",
            join_terms(&converting)
        ));
    }

    let length = title.chars().count();
    if (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&length) {
        recs.push("Title length is within 50-60 characters; keep it there.".to_string());
    } else {
        recs.push(format!(
            "Keep title length between 50-60 characters (currently {length})."
        ));
    }

    recs
}

fn description_suggestions(
    keywords: &KeywordAnalysis,
    competitors: Option<&CompetitorAnalysis>,
    search: Option<&SearchConsoleReport>,
) -> Vec<String> {
    let mut recs = vec![
        "Write a compelling meta description (150-160 characters) including primary keywords."
            .to_string(),
    ];

    let secondary: Vec<&str> = keywords
        .ranked
        .iter()
        .skip(1)
        .take(3)
        .map(|s| s.term.as_str())
        .collect();
    if !secondary.is_empty() {
        recs.push(format!(
            "Naturally incorporate 2-4 secondary keywords like: {}",
            join_terms(&secondary)
        ));
    }

    if let Some(features) = competitors.map(|c| &c.unique_features).filter(|f| !f.is_empty()) {
        recs.push(format!(
            "Highlight unique selling points: {}",
            join_terms(features)
        ));
    }

    let low_ctr: Vec<&str> = search
        .into_iter()
        .flat_map(|s| s.high_impression_low_ctr.iter())
        .take(LOW_CTR_QUERIES)
        .map(|o| o.query.as_str())
        .collect();
    if !low_ctr.is_empty() {
        recs.push(format!(
            "Address user intent behind low CTR queries like: {}",
            join_terms(&low_ctr)
        ));
    }

    recs
}

fn other_suggestions(competitors: Option<&CompetitorAnalysis>) -> Vec<String> {
    let mut recs = vec![
        "Use primary keywords in H1 and relevant H2 headings.".to_string(),
        "Optimize image alt text with descriptive keywords.".to_string(),
        "Implement structured data (Schema.org Product) for rich results.".to_string(),
    ];

    let competitor_keywords: Vec<&str> = competitors
        .into_iter()
        .flat_map(|c| c.common_keywords.iter())
        .take(COMPETITOR_KEYWORDS)
        .map(String::as_str)
        .collect();
    if !competitor_keywords.is_empty() {
        recs.push(format!(
            "Review competitor keyword usage for ideas: {}",
            join_terms(&competitor_keywords)
        ));
    }

    recs
}

/// Needs a keyword analysis in the store.
pub struct ContentOptimizer;

#[async_trait]
impl Analysis for ContentOptimizer {
    fn key(&self) -> StageKey {
        StageKey::ContentOptimization
    }

    async fn run(&self, product: &Product, store: &RunResultStore) -> Result<StageOutput> {
        let keywords = store
            .keyword_analysis()
            .ok_or_else(|| SeoContextError::empty_result(self.key().as_str()))?;
        Ok(StageOutput::Content(optimize_content(
            product,
            keywords,
            store.competitor_analysis(),
            store.search_console(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_keywords;
    use seocontext_shared::SignalRecord;
    use seocontext_shared::CtrOpportunity;

    fn product() -> Product {
        Product {
            ean: Some("1".into()),
            brand: Some("Sage".into()),
            title: Some("Slow Cooker".into()),
            ..Product::default()
        }
    }

    fn keywords() -> KeywordAnalysis {
        analyze_keywords(vec![
            SignalRecord::new("sage cooker", SourceKind::Analytics)
                .with_metric(metric::SESSIONS, 500.0)
                .with_metric(metric::CONVERSION_RATE, 4.0),
            SignalRecord::new("slow cooker", SourceKind::SearchConsole).with_metric(metric::CLICKS, 10.0),
            SignalRecord::new("6l slow cooker", SourceKind::SearchConsole).with_metric(metric::CLICKS, 5.0),
        ])
    }

    #[test]
    fn title_suggestions_follow_keywords_and_brand() {
        let content = optimize_content(&product(), &keywords(), None, None);

        assert_eq!(content.primary_keyword.as_deref(), Some("sage cooker"));
        assert_eq!(
            content.title_suggestions,
            vec![
                "Include primary keyword 'sage cooker' early in the title.".to_string(),
                "Add brand name 'Sage' to the title.".to_string(),
                "Consider incorporating high-converting terms like: sage cooker".to_string(),
                "Keep title length between 50-60 characters (currently 11).".to_string(),
            ]
        );
    }

    #[test]
    fn description_and_other_use_competitor_and_search_data() {
        let competitors = CompetitorAnalysis {
            unique_features: vec!["Auto keep-warm".into()],
            common_keywords: (1..=7).map(|i| format!("kw{i}")).collect(),
            ..CompetitorAnalysis::default()
        };
        let search = SearchConsoleReport {
            high_impression_low_ctr: (1..=4)
                .map(|i| CtrOpportunity {
                    query: format!("q{i}"),
                    impressions: 1000.0,
                    current_ctr: 0.5,
                    potential_clicks: 50.0,
                })
                .collect(),
            ..SearchConsoleReport::default()
        };

        let content = optimize_content(&product(), &keywords(), Some(&competitors), Some(&search));

        assert_eq!(
            content.description_suggestions[1],
            "Naturally incorporate 2-4 secondary keywords like: slow cooker, 6l slow cooker"
        );
        assert_eq!(content.description_suggestions[2], "Highlight unique selling points: Auto keep-warm");
        assert_eq!(
            content.description_suggestions[3],
            "Address user intent behind low CTR queries like: q1, q2, q3"
        );
        assert_eq!(
            content.other_suggestions.last().map(String::as_str),
            Some("Review competitor keyword usage for ideas: kw1, kw2, kw3, kw4, kw5")
        );
    }

    #[tokio::test]
    async fn optimizer_needs_keyword_analysis() {
        let err = ContentOptimizer
            .run(&product(), &RunResultStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SeoContextError::EmptyResult { .. }));
    }
}
