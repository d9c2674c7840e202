//! Insight extractors.
//!
//! Each function derives one `seo_context` section from the typed records it
//! needs. They only read; a missing record yields an empty section.

use seocontext_shared::{
    CompetitorInsights, ContentRecommendations, DataQualityIssue, KeywordEntry, MarketPositioning,
    PerformanceSummary, QueryInsight, SearchInsights, SeasonalTrends, UserSegment,
};
use seocontext_sources::{AnalyticsReport, MerchantReport, SearchConsoleReport, TrendReport};

use crate::analysis::{CompetitorAnalysis, ContentOptimization, KeywordAnalysis, PriceIntelligence};
use crate::ranking::TOP_KEYWORDS;

const TOP_QUERIES: usize = 5;
const TOP_CTR_OPPORTUNITIES: usize = 3;
const TOP_COMPETITORS: usize = 5;
const TOP_SEGMENTS: usize = 3;
const TOP_ISSUES: usize = 5;

/// The first [`TOP_KEYWORDS`] ranked terms with their score and leading source.
pub fn high_value_keywords(keywords: Option<&KeywordAnalysis>) -> Vec<KeywordEntry> {
    let Some(keywords) = keywords else {
        return Vec::new();
    };
    keywords
        .ranked
        .iter()
        .take(TOP_KEYWORDS)
        .map(|signal| KeywordEntry {
            term: signal.term.clone(),
            score: signal.score,
            source: signal
                .primary_source()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn search_insights(search: Option<&SearchConsoleReport>) -> SearchInsights {
    let Some(search) = search else {
        return SearchInsights::default();
    };
    SearchInsights {
        total_impressions: search.totals.impressions,
        total_clicks: search.totals.clicks,
        avg_ctr: search.totals.avg_ctr,
        avg_position: search.totals.avg_position,
        dominant_device: search.dominant_device.clone(),
        top_queries: search
            .queries
            .iter()
            .take(TOP_QUERIES)
            .map(|q| QueryInsight {
                query: q.query.clone(),
                impressions: q.impressions,
                clicks: q.clicks,
                ctr: q.ctr,
                avg_position: q.avg_position,
            })
            .collect(),
        low_ctr_opportunities: search
            .high_impression_low_ctr
            .iter()
            .take(TOP_CTR_OPPORTUNITIES)
            .cloned()
            .collect(),
    }
}

/// Top competitors; keyword and feature lists pass through unchanged.
pub fn competitor_insights(analysis: Option<&CompetitorAnalysis>) -> CompetitorInsights {
    let Some(analysis) = analysis else {
        return CompetitorInsights::default();
    };
    CompetitorInsights {
        top_competitors: analysis.competitors.iter().take(TOP_COMPETITORS).cloned().collect(),
        common_keywords: analysis.common_keywords.clone(),
        unique_features_vs_competitors: analysis.unique_features.clone(),
        pricing_position: analysis
            .pricing
            .and_then(|p| p.position)
            .map(|p| p.as_str().to_string()),
    }
}

pub fn market_positioning(
    merchant: Option<&MerchantReport>,
    pricing: Option<&PriceIntelligence>,
) -> MarketPositioning {
    MarketPositioning {
        price_position_merchant: merchant
            .and_then(|m| m.price.as_ref())
            .and_then(|p| p.relative_position)
            .map(|p| p.as_str().to_string()),
        category_price_range: merchant.and_then(|m| m.category_range),
        price_position_external: pricing
            .and_then(|p| p.market_position)
            .map(|p| p.as_str().to_string()),
    }
}

pub fn content_recommendations(content: Option<&ContentOptimization>) -> ContentRecommendations {
    content
        .map(|c| ContentRecommendations {
            title_suggestions: c.title_suggestions.clone(),
            description_suggestions: c.description_suggestions.clone(),
            other_suggestions: c.other_suggestions.clone(),
        })
        .unwrap_or_default()
}

/// Best device x source segments: conversion rate first, then user count.
pub fn user_segments(analytics: Option<&AnalyticsReport>) -> Vec<UserSegment> {
    let mut segments: Vec<UserSegment> = analytics
        .map(|a| a.user_segments.clone())
        .unwrap_or_default();
    segments.sort_by(|a, b| {
        b.conversion_rate
            .total_cmp(&a.conversion_rate)
            .then_with(|| b.users.total_cmp(&a.users))
    });
    segments.truncate(TOP_SEGMENTS);
    segments
}

/// Either source can flag seasonality. The analytics peak month wins when both have one.
pub fn seasonal_trends(
    analytics: Option<&AnalyticsReport>,
    trends: Option<&TrendReport>,
) -> SeasonalTrends {
    let from_analytics = analytics.and_then(|a| a.seasonality.as_ref());
    let from_trends = trends.and_then(|t| t.seasonality.as_ref());

    let analytics_seasonal = from_analytics.map(|s| s.is_seasonal);
    let trend_seasonal = from_trends.map(|s| s.is_seasonal);

    SeasonalTrends {
        is_seasonal: analytics_seasonal.unwrap_or(false) || trend_seasonal.unwrap_or(false),
        peak_month: from_analytics
            .and_then(|s| s.peak_month.clone())
            .or_else(|| from_trends.and_then(|s| s.peak_month.clone())),
        analytics_seasonal,
        trend_seasonal,
        monthly_interest: from_trends
            .map(|s| s.monthly_averages.clone())
            .unwrap_or_default(),
    }
}

/// Critical and error issues, most severe first.
pub fn data_quality_issues(merchant: Option<&MerchantReport>) -> Vec<DataQualityIssue> {
    let Some(merchant) = merchant else {
        return Vec::new();
    };
    let mut issues: Vec<DataQualityIssue> = merchant
        .issues
        .iter()
        .filter(|i| i.severity.is_blocking())
        .map(|i| DataQualityIssue {
            code: i.code.clone(),
            severity: i.severity,
            description: i.description.clone(),
            attribute: i.attribute.clone(),
        })
        .collect();
    issues.sort_by_key(|i| i.severity.rank());
    issues.truncate(TOP_ISSUES);
    issues
}

/// Rates from analytics, merchant and search console. Unmeasured stays `None`.
pub fn performance_summary(
    analytics: Option<&AnalyticsReport>,
    merchant: Option<&MerchantReport>,
    search: Option<&SearchConsoleReport>,
) -> PerformanceSummary {
    let shopping = merchant.and_then(|m| m.metrics.as_ref());
    let totals = search.map(|s| &s.totals);

    PerformanceSummary {
        analytics_conversion_rate: analytics
            .and_then(|a| a.conversion.as_ref())
            .and_then(|c| c.conversion_rate),
        merchant_conversion_rate: shopping.and_then(|m| m.conversion_rate),
        search_console_ctr: totals.and_then(|t| t.avg_ctr),
        merchant_ctr: shopping.and_then(|m| m.ctr),
        search_console_impressions: totals.and_then(|t| t.impressions),
        search_console_clicks: totals.and_then(|t| t.clicks),
    }
}
