use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;

use seocontext_shared::{Product, Result, SeoContextError};
use seocontext_sources::{MerchantReport, PricePosition, WebCrawlReport, relative_position};

use super::Analysis;
use crate::store::{RunResultStore, StageKey, StageOutput};

/// Where the product's price sits in its market.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceIntelligence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_price: Option<f64>,
    pub competitor_prices: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitor_average: Option<f64>,
    /// Product price against the competitor average.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_position: Option<PricePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_benchmark: Option<f64>,
}

#[instrument(skip_all)]
pub fn price_intelligence(
    product: &Product,
    merchant: Option<&MerchantReport>,
    crawl: Option<&WebCrawlReport>,
) -> PriceIntelligence {
    let merchant_price = merchant.and_then(|m| m.price.as_ref());
    let product_price = product
        .price()
        .or_else(|| merchant_price.and_then(|p| p.product_price));

    let competitor_prices: Vec<f64> = crawl
        .into_iter()
        .flat_map(|c| c.pages.iter())
        .filter_map(|p| p.price)
        .filter(|p| *p > 0.0)
        .collect();
    let competitor_average = (!competitor_prices.is_empty())
        .then(|| competitor_prices.iter().sum::<f64>() / competitor_prices.len() as f64);

    let market_position = match (product_price, competitor_average) {
        (Some(price), Some(average)) => Some(relative_position(price, average)),
        _ => None,
    };

    PriceIntelligence {
        product_price,
        competitor_prices,
        competitor_average,
        market_position,
        merchant_benchmark: merchant_price.and_then(|p| p.price_benchmark),
    }
}

/// Needs a merchant payload or crawled pages that carry prices.
pub struct PriceAnalyzer;

#[async_trait]
impl Analysis for PriceAnalyzer {
    fn key(&self) -> StageKey {
        StageKey::PriceIntelligence
    }

    async fn run(&self, product: &Product, store: &RunResultStore) -> Result<StageOutput> {
        let merchant = store.merchant();
        let crawl = store.web_crawl();
        let priced_pages = crawl.is_some_and(|c| c.pages.iter().any(|p| p.price.is_some()));
        if merchant.is_none() && !priced_pages {
            return Err(SeoContextError::empty_result(self.key().as_str()));
        }
        Ok(StageOutput::Pricing(price_intelligence(product, merchant, crawl)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seocontext_sources::payload::merchant::PriceCompetitiveness;
    use seocontext_sources::payload::web_crawl::CompetitorPage;

    fn priced_page(price: f64) -> CompetitorPage {
        CompetitorPage {
            name: Some("shop".into()),
            url: None,
            title: None,
            price: Some(price),
            features: Vec::new(),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn falls_back_to_merchant_product_price() {
        let merchant = MerchantReport {
            price: Some(PriceCompetitiveness {
                price_benchmark: Some(120.0),
                product_price: Some(90.0),
                relative_position: None,
            }),
            ..MerchantReport::default()
        };
        let crawl = WebCrawlReport {
            pages: vec![priced_page(100.0), priced_page(120.0)],
        };

        let intel = price_intelligence(&Product::default(), Some(&merchant), Some(&crawl));
        assert_eq!(intel.product_price, Some(90.0));
        assert_eq!(intel.competitor_average, Some(110.0));
        assert_eq!(intel.market_position, Some(PricePosition::BelowAverage));
        assert_eq!(intel.merchant_benchmark, Some(120.0));
    }

    #[test]
    fn no_prices_means_no_position() {
        let intel = price_intelligence(&Product::default(), Some(&MerchantReport::default()), None);
        assert_eq!(intel, PriceIntelligence::default());
    }

    #[tokio::test]
    async fn analyzer_needs_price_data() {
        let err = PriceAnalyzer
            .run(&Product::default(), &RunResultStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SeoContextError::EmptyResult { .. }));
    }
}
