use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use seocontext_shared::{Product, Result, SeoContextError, normalize_term};
use seocontext_sources::payload::competitor_db::CompetitorDbReport;
use seocontext_sources::payload::web_crawl::{CompetitorPage, WebCrawlReport};
use seocontext_sources::{PricePosition, relative_position};

use super::{Analysis, join_terms};
use crate::store::{RunResultStore, StageKey, StageOutput};

/// A keyword must appear on this many competitor pages to count as common.
const COMMON_KEYWORD_MIN_PAGES: usize = 2;

/// Who the product competes with and how it compares.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompetitorAnalysis {
    /// Crawled competitor names first, then competitor-db domains.
    pub competitors: Vec<String>,
    pub common_keywords: Vec<String>,
    /// Product features no competitor mentions.
    pub unique_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<CompetitorPricing>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompetitorPricing {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Product price against `average`. `None` when the product has no price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PricePosition>,
}

/// Compare the product with crawled competitor pages and competitor-db domains.
#[instrument(skip_all)]
pub fn analyze_competitors(
    product: &Product,
    crawl: Option<&WebCrawlReport>,
    db: Option<&CompetitorDbReport>,
) -> CompetitorAnalysis {
    let pages: &[CompetitorPage] = crawl.map(|c| c.pages.as_slice()).unwrap_or_default();

    let competitors = competitor_names(pages, db);
    let common_keywords = common_keywords(pages);
    let unique_features = unique_features(&product.features(), pages);
    let pricing = pricing(product.price(), pages);
    let recommendations = recommendations(&common_keywords, &unique_features, pricing.as_ref());

    debug!(
        competitors = competitors.len(),
        common = common_keywords.len(),
        unique = unique_features.len(),
        "competitors analyzed"
    );

    CompetitorAnalysis {
        competitors,
        common_keywords,
        unique_features,
        pricing,
        recommendations,
    }
}

fn competitor_names(pages: &[CompetitorPage], db: Option<&CompetitorDbReport>) -> Vec<String> {
    let crawled = pages.iter().filter_map(CompetitorPage::display_name);
    let domains = db
        .into_iter()
        .flat_map(|db| db.competitors.iter())
        .map(|c| c.domain.trim().trim_start_matches("www.").to_string());

    let mut names: Vec<String> = Vec::new();
    for name in crawled.chain(domains) {
        if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    names
}

/// Keywords present on at least two pages, most frequent first.
/// Equal counts keep first-seen order.
fn common_keywords(pages: &[CompetitorPage]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for page in pages {
        let mut seen_on_page: Vec<String> = Vec::new();
        for keyword in &page.keywords {
            let term = normalize_term(keyword);
            if term.is_empty() || seen_on_page.contains(&term) {
                continue;
            }
            seen_on_page.push(term.clone());
            let count = counts.entry(term.clone()).or_insert(0);
            if *count == 0 {
                order.push(term);
            }
            *count += 1;
        }
    }

    let mut common: Vec<(String, usize)> = order
        .into_iter()
        .filter_map(|term| {
            let count = counts.get(&term).copied().unwrap_or_default();
            (count >= COMMON_KEYWORD_MIN_PAGES).then_some((term, count))
        })
        .collect();
    common.sort_by(|a, b| b.1.cmp(&a.1));
    common.into_iter().map(|(term, _)| term).collect()
}

fn unique_features(features: &[String], pages: &[CompetitorPage]) -> Vec<String> {
    let competitor_text: Vec<String> = pages
        .iter()
        .flat_map(|p| p.features.iter().chain(p.keywords.iter()).chain(p.title.iter()))
        .map(|s| s.to_lowercase())
        .collect();

    features
        .iter()
        .filter(|feature| {
            let needle = feature.to_lowercase();
            !competitor_text.iter().any(|text| text.contains(&needle))
        })
        .cloned()
        .collect()
}

fn pricing(product_price: Option<f64>, pages: &[CompetitorPage]) -> Option<CompetitorPricing> {
    let prices: Vec<f64> = pages
        .iter()
        .filter_map(|p| p.price)
        .filter(|p| *p > 0.0)
        .collect();
    if prices.is_empty() {
        return None;
    }

    let average = prices.iter().sum::<f64>() / prices.len() as f64;
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(CompetitorPricing {
        average,
        min,
        max,
        position: product_price.map(|price| relative_position(price, average)),
    })
}

fn recommendations(
    common_keywords: &[String],
    unique_features: &[String],
    pricing: Option<&CompetitorPricing>,
) -> Vec<String> {
    let mut recs = Vec::new();

    if !unique_features.is_empty() {
        recs.push(format!(
            "Highlight unique features mentioned less by competitors: {}",
            join_terms(unique_features)
        ));
    }
    match pricing.and_then(|p| p.position) {
        Some(PricePosition::AboveAverage) => recs.push(
            "Justify the higher price by emphasizing premium quality or unique features."
                .to_string(),
        ),
        Some(PricePosition::BelowAverage) => recs.push(
            "Mention the competitive price point in the title or description.".to_string(),
        ),
        _ => {}
    }
    if !common_keywords.is_empty() {
        recs.push(format!(
            "Consider incorporating common competitor keywords like: {}",
            join_terms(common_keywords)
        ));
    }

    recs
}

/// Needs a web crawl or competitor-db payload.
pub struct CompetitorAnalyzer;

#[async_trait]
impl Analysis for CompetitorAnalyzer {
    fn key(&self) -> StageKey {
        StageKey::CompetitorAnalysis
    }

    async fn run(&self, product: &Product, store: &RunResultStore) -> Result<StageOutput> {
        let crawl = store.web_crawl();
        let db = store.competitor_db();
        if crawl.is_none() && db.is_none() {
            return Err(SeoContextError::empty_result(self.key().as_str()));
        }
        Ok(StageOutput::Competitors(analyze_competitors(product, crawl, db)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seocontext_sources::payload::competitor_db::CompetitorDomain;
    use serde_json::json;

    fn page(name: &str, price: Option<f64>, keywords: &[&str], features: &[&str]) -> CompetitorPage {
        CompetitorPage {
            name: Some(name.into()),
            url: None,
            title: None,
            price,
            features: features.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn product(price: f64, features: &[&str]) -> Product {
        serde_json::from_value(json!({
            "ean": "1",
            "title": "Sage Slow Cooker",
            "price": price,
            "features": features,
        }))
        .expect("valid product")
    }

    #[test]
    fn common_keywords_need_two_pages() {
        let pages = vec![
            page("A", None, &["slow cooker", "ceramic", "Slow Cooker"], &[]),
            page("B", None, &["timer", "slow cooker", "ceramic"], &[]),
            page("C", None, &["timer", "slow cooker", "searing"], &[]),
        ];
        assert_eq!(
            common_keywords(&pages),
            vec!["slow cooker".to_string(), "ceramic".to_string(), "timer".to_string()]
        );
    }

    #[test]
    fn unique_features_ignore_case() {
        let pages = vec![page("A", None, &[], &["Searing function", "6L bowl"])];
        let features = vec!["searing function".to_string(), "Auto keep-warm".to_string()];
        assert_eq!(unique_features(&features, &pages), vec!["Auto keep-warm".to_string()]);
    }

    #[test]
    fn competitors_are_deduplicated_across_sources() {
        let pages = vec![page("kitchenwarehouse.com", None, &[], &[])];
        let db = CompetitorDbReport {
            competitors: vec![
                CompetitorDomain { domain: "www.kitchenwarehouse.com".into(), common_keywords: None },
                CompetitorDomain { domain: "myer.com.au".into(), common_keywords: Some(12.0) },
            ],
            ..CompetitorDbReport::default()
        };
        assert_eq!(
            competitor_names(&pages, Some(&db)),
            vec!["kitchenwarehouse.com".to_string(), "myer.com.au".to_string()]
        );
    }

    #[test]
    fn pricing_position_uses_average() {
        let crawl = WebCrawlReport {
            pages: vec![page("A", Some(100.0), &[], &[]), page("B", Some(200.0), &[], &[])],
        };
        let analysis = analyze_competitors(&product(199.0, &[]), Some(&crawl), None);
        let pricing = analysis.pricing.expect("pricing");

        assert_eq!(pricing.average, 150.0);
        assert_eq!(pricing.min, 100.0);
        assert_eq!(pricing.max, 200.0);
        assert_eq!(pricing.position, Some(PricePosition::AboveAverage));
        assert!(analysis.recommendations[0].starts_with("Justify the higher price"));
    }

    #[tokio::test]
    async fn analyzer_needs_competitor_data() {
        let err = CompetitorAnalyzer
            .run(&product(10.0, &[]), &RunResultStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SeoContextError::EmptyResult { .. }));
    }
}
