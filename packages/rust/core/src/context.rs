//! Final context assembly.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use seocontext_shared::{Product, ProductContext, SeoContext, is_empty_value};

use crate::extract;
use crate::store::RunResultStore;

/// Flat product attributes for the top level of the context.
///
/// Base fields come first. An enriched value replaces a base value only when
/// it is non-empty, and fills fields the base does not have.
pub fn product_attributes(product: &Product) -> Map<String, Value> {
    let mut attrs = Map::new();

    let base = [
        ("ean", product.identifier()),
        ("id", product.id.as_deref()),
        ("brand", product.brand.as_deref()),
        ("title", product.title.as_deref()),
        ("description", product.description.as_deref()),
    ];
    for (key, value) in base {
        if let Some(value) = value {
            attrs.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    for (key, value) in &product.attributes {
        attrs.insert(key.clone(), value.clone());
    }

    for (key, enriched) in &product.enriched_data {
        let base_present = attrs.get(key).is_some_and(|v| !is_empty_value(v));
        if !is_empty_value(enriched) || !base_present {
            attrs.insert(key.clone(), enriched.clone());
        }
    }

    attrs
}

/// Assemble the product context from the product and a completed run store.
#[instrument(skip_all, fields(product = %product.key()))]
pub fn build_context(product: &Product, store: &RunResultStore) -> ProductContext {
    let keywords = store.keyword_analysis();

    let seo_context = SeoContext {
        sources_used: store.keys().into_iter().map(String::from).collect(),
        high_value_keywords: extract::high_value_keywords(keywords),
        search_insights: extract::search_insights(store.search_console()),
        competitor_insights: extract::competitor_insights(store.competitor_analysis()),
        market_positioning: extract::market_positioning(
            store.merchant(),
            store.price_intelligence(),
        ),
        content_recommendations: extract::content_recommendations(store.content_optimization()),
        user_segments: extract::user_segments(store.analytics()),
        seasonal_trends: extract::seasonal_trends(store.analytics(), store.trends()),
        data_quality_issues: extract::data_quality_issues(store.merchant()),
        performance_summary: extract::performance_summary(
            store.analytics(),
            store.merchant(),
            store.search_console(),
        ),
    };

    debug!(
        sources = seo_context.sources_used.len(),
        keywords = seo_context.high_value_keywords.len(),
        "context built"
    );

    ProductContext {
        attributes: product_attributes(product),
        seo_context,
    }
}
