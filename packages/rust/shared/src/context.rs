//! The unified product context handed to content generation.
//!
//! Every section defaults to empty collections so a run with degraded sources
//! still serializes to the same shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root output: flat product attributes plus the nested `seo_context`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductContext {
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub seo_context: SeoContext,
}

/// All derived insight sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeoContext {
    /// Run result store keys, in insertion order.
    pub sources_used: Vec<String>,
    pub high_value_keywords: Vec<KeywordEntry>,
    pub search_insights: SearchInsights,
    pub competitor_insights: CompetitorInsights,
    pub market_positioning: MarketPositioning,
    pub content_recommendations: ContentRecommendations,
    pub user_segments: Vec<UserSegment>,
    pub seasonal_trends: SeasonalTrends,
    pub data_quality_issues: Vec<DataQualityIssue>,
    pub performance_summary: PerformanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub term: String,
    pub score: f64,
    /// First source that reported the term.
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_impressions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_clicks: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_ctr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_device: Option<String>,
    pub top_queries: Vec<QueryInsight>,
    pub low_ctr_opportunities: Vec<CtrOpportunity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInsight {
    pub query: String,
    pub impressions: f64,
    pub clicks: f64,
    pub ctr: f64,
    pub avg_position: f64,
}

/// A query with plenty of impressions but a weak click-through rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrOpportunity {
    pub query: String,
    pub impressions: f64,
    pub current_ctr: f64,
    pub potential_clicks: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitorInsights {
    pub top_competitors: Vec<String>,
    pub common_keywords: Vec<String>,
    pub unique_features_vs_competitors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_position: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketPositioning {
    /// Position reported by the merchant platform's price benchmark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_position_merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_price_range: Option<PriceRange>,
    /// Position against crawled competitor prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_position_external: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecommendations {
    pub title_suggestions: Vec<String>,
    pub description_suggestions: Vec<String>,
    pub other_suggestions: Vec<String>,
}

/// A device x traffic-source slice of analytics users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegment {
    pub device: String,
    pub source: String,
    pub users: f64,
    pub conversions: f64,
    #[serde(default)]
    pub avg_duration: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonalTrends {
    pub is_seasonal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_seasonal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_seasonal: Option<bool>,
    /// Average trend interest per calendar month (`"01"`..`"12"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub monthly_interest: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub code: String,
    pub severity: crate::types::IssueSeverity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Rate fields pulled from each source. `None` means the source was not
/// measured, which is different from a measured zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub analytics_conversion_rate: Option<f64>,
    pub merchant_conversion_rate: Option<f64>,
    pub search_console_ctr: Option<f64>,
    pub merchant_ctr: Option<f64>,
    pub search_console_impressions: Option<f64>,
    pub search_console_clicks: Option<f64>,
}
