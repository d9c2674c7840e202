//! Shared types, error model, and configuration for seocontext.
//!
//! This crate is the foundation depended on by all other seocontext crates.
//! It provides:
//! - [`SeoContextError`]: the unified error type
//! - Signal types ([`SignalRecord`], [`SignalCandidate`], [`AggregatedSignal`], [`SourceKind`])
//! - Product input and the [`ProductContext`] output
//! - Configuration ([`AppConfig`], [`SourceConfig`], config loading)

pub mod config;
pub mod context;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConnectorKind, DefaultsConfig, SourceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key, validate_sources,
};
pub use context::{
    CompetitorInsights, ContentRecommendations, CtrOpportunity, DataQualityIssue, KeywordEntry,
    MarketPositioning, PerformanceSummary, PriceRange, ProductContext, QueryInsight,
    SearchInsights, SeasonalTrends, SeoContext, UserSegment,
};
pub use error::{Result, SeoContextError};
pub use types::{
    AggregatedSignal, Intent, IssueSeverity, Metrics, Product, RunId, SignalCandidate,
    SignalRecord, SourceId, SourceKind, is_empty_value, metric, normalize_term,
};
