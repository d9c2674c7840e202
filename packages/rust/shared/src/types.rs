//! Core domain types for the signal pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SeoContextError};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one product-processing run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SourceId
// ---------------------------------------------------------------------------

/// A data source queried during collection. Each one owns a key in the run
/// result store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Analytics,
    SearchConsole,
    MerchantCenter,
    CompetitorDb,
    TrendService,
    WebCrawl,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Analytics,
        SourceId::SearchConsole,
        SourceId::MerchantCenter,
        SourceId::CompetitorDb,
        SourceId::TrendService,
        SourceId::WebCrawl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::SearchConsole => "search_console",
            Self::MerchantCenter => "merchant_center",
            Self::CompetitorDb => "competitor_db",
            Self::TrendService => "trend_service",
            Self::WebCrawl => "web_crawl",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceId {
    type Err = SeoContextError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| SeoContextError::config(format!("unknown source id '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Where a signal record came from.
///
/// Declaration order is the merge priority used during aggregation: when two
/// sources report the same metric for one term, the higher-priority value is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Analytics,
    SearchConsole,
    CompetitorDb,
    TrendService,
    RawRelated,
}

impl SourceKind {
    /// All kinds, highest priority first.
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Analytics,
        SourceKind::SearchConsole,
        SourceKind::CompetitorDb,
        SourceKind::TrendService,
        SourceKind::RawRelated,
    ];

    /// Merge priority, 0 is highest.
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analytics => "analytics",
            Self::SearchConsole => "search-console",
            Self::CompetitorDb => "competitor-db",
            Self::TrendService => "trend-service",
            Self::RawRelated => "raw-related",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Well-known metric names carried on signal records.
pub mod metric {
    pub const SESSIONS: &str = "sessions";
    pub const CONVERSIONS: &str = "conversions";
    pub const CONVERSION_RATE: &str = "conversion_rate";
    pub const VIEWS: &str = "views";
    pub const CLICKS: &str = "clicks";
    pub const IMPRESSIONS: &str = "impressions";
    pub const CTR: &str = "ctr";
    pub const AVG_POSITION: &str = "avg_position";
    pub const SEARCH_VOLUME: &str = "search_volume";
    pub const CPC: &str = "cpc";
    pub const COMPETITION: &str = "competition";
    pub const RELEVANCE: &str = "relevance";
    pub const VALUE: &str = "value";
    /// Indicator metric: 1.0 when a trend query came from the rising list.
    pub const RISING: &str = "rising";
}

/// Named numeric fields observed for a term. The set of names varies by source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, f64>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, or 0 when the field is missing.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    /// Value of `name` when present.
    pub fn get_opt(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Copy in every field of `other` that is not already present.
    /// Existing values are never overwritten.
    pub fn merge_missing(&mut self, other: &Metrics) {
        for (name, value) in &other.0 {
            self.0.entry(name.clone()).or_insert(*value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// SignalRecord / candidates / AggregatedSignal
// ---------------------------------------------------------------------------

/// One observed keyword or query from a single source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub term: String,
    pub source: SourceKind,
    pub metrics: Metrics,
    /// The source row this record was derived from.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl SignalRecord {
    pub fn new(term: impl Into<String>, source: SourceKind) -> Self {
        Self {
            term: term.into(),
            source,
            metrics: Metrics::new(),
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.set(name, value);
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }
}

/// Case-fold a term for identity comparison: lower-case, surrounding whitespace removed.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// A deduplicated term before scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalCandidate {
    pub term: String,
    /// Distinct sources, in first-seen order.
    pub contributing_sources: Vec<SourceKind>,
    pub metrics: Metrics,
    /// Raw rows of every record folded into this candidate.
    #[serde(skip)]
    pub raw: Vec<serde_json::Value>,
}

impl SignalCandidate {
    pub fn has_source(&self, source: SourceKind) -> bool {
        self.contributing_sources.contains(&source)
    }

    /// The first source that reported this term.
    pub fn primary_source(&self) -> Option<SourceKind> {
        self.contributing_sources.first().copied()
    }
}

/// Coarse search-motivation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Informational,
    Navigational,
    Transactional,
    Unknown,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Navigational => "navigational",
            Self::Transactional => "transactional",
            Self::Unknown => "unknown",
        }
    }
}

/// A scored and classified signal. Built once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSignal {
    pub term: String,
    pub contributing_sources: Vec<SourceKind>,
    pub metrics: Metrics,
    pub score: f64,
    pub intent: Intent,
}

impl AggregatedSignal {
    pub fn primary_source(&self) -> Option<SourceKind> {
        self.contributing_sources.first().copied()
    }

    pub fn has_source(&self, source: SourceKind) -> bool {
        self.contributing_sources.contains(&source)
    }
}

// ---------------------------------------------------------------------------
// IssueSeverity
// ---------------------------------------------------------------------------

/// Severity of a product data issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Error,
    Warning,
    Info,
    #[serde(other)]
    Unknown,
}

impl IssueSeverity {
    /// Fixed sort rank: critical first, unknown last.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Error => 1,
            Self::Warning => 2,
            Self::Info => 3,
            Self::Unknown => 4,
        }
    }

    /// Critical and error issues block listings; the rest are advisory.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::Error)
    }
}

// ---------------------------------------------------------------------------
// Product input
// ---------------------------------------------------------------------------

/// One product to build context for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
    /// Feed identifier; stands in for the EAN when that is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attributes from an earlier enrichment pass.
    #[serde(default, alias = "enrichedData", skip_serializing_if = "serde_json::Map::is_empty")]
    pub enriched_data: serde_json::Map<String, serde_json::Value>,
    /// Any other product attribute (price, category, features, ...).
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Alphanumeric runs (plus `_`) joined by `-`.
fn slug(value: &str) -> String {
    value
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

impl Product {
    /// Reject products that carry neither an identifier nor a title.
    pub fn validate(&self) -> Result<()> {
        let has_title = self.title.as_deref().is_some_and(|s| !s.trim().is_empty());
        if self.identifier().is_some() || has_title {
            Ok(())
        } else {
            Err(SeoContextError::validation(
                "product needs an ean/id or a title",
            ))
        }
    }

    /// The EAN, else the feed id. Blank values do not count.
    pub fn identifier(&self) -> Option<&str> {
        [&self.ean, &self.id]
            .into_iter()
            .filter_map(|v| v.as_deref().map(str::trim))
            .find(|s| !s.is_empty())
    }

    /// Stable key for per-product lookups and file names: a slug of the
    /// identifier, else of the title. Never contains path separators or dots.
    pub fn key(&self) -> String {
        let source = match self.identifier() {
            Some(identifier) => identifier.to_string(),
            None => self.title.as_deref().unwrap_or_default().to_lowercase(),
        };
        slug(&source)
    }

    /// Looks in base attributes first, then enriched data.
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes
            .get(name)
            .filter(|v| !is_empty_value(v))
            .or_else(|| self.enriched_data.get(name).filter(|v| !is_empty_value(v)))
    }

    /// Product price, accepting numbers or numeric strings (`"129.95"`, `"129,95"`).
    pub fn price(&self) -> Option<f64> {
        match self.attribute("price")? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    /// Declared product features (`features` attribute, list of strings).
    pub fn features(&self) -> Vec<String> {
        match self.attribute("features") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Null, empty strings, empty arrays and empty objects count as "no value".
pub fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_priority_follows_declaration_order() {
        let priorities: Vec<u8> = SourceKind::ALL.iter().map(|s| s.priority()).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3, 4]);
        assert!(SourceKind::Analytics < SourceKind::RawRelated);
    }

    #[test]
    fn source_id_parses_store_keys() {
        let id: SourceId = "trend_service".parse().expect("parse id");
        assert_eq!(id, SourceId::TrendService);
        assert!("google_trends".parse::<SourceId>().is_err());
    }

    #[test]
    fn source_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&SourceKind::SearchConsole).expect("serialize");
        assert_eq!(json, "\"search-console\"");
        assert_eq!(SourceKind::TrendService.to_string(), "trend-service");
    }

    #[test]
    fn metrics_merge_keeps_existing_values() {
        let mut first: Metrics = [("clicks", 40.0), ("impressions", 500.0)].into_iter().collect();
        let second: Metrics = [("clicks", 99.0), ("sessions", 12.0)].into_iter().collect();
        first.merge_missing(&second);

        assert_eq!(first.get("clicks"), 40.0);
        assert_eq!(first.get("sessions"), 12.0);
        assert_eq!(first.get("conversions"), 0.0);
        assert_eq!(first.get_opt("conversions"), None);
    }

    #[test]
    fn normalize_term_folds_case_and_whitespace() {
        assert_eq!(normalize_term("Shoes"), "shoes");
        assert_eq!(normalize_term("shoes "), "shoes");
        assert_eq!(normalize_term("  Sage Cooker\t"), "sage cooker");
    }

    #[test]
    fn severity_parses_unknown_values() {
        let sev: IssueSeverity = serde_json::from_str("\"critical\"").expect("parse");
        assert_eq!(sev, IssueSeverity::Critical);
        let sev: IssueSeverity = serde_json::from_str("\"suggestion\"").expect("parse");
        assert_eq!(sev, IssueSeverity::Unknown);
        assert_eq!(sev.rank(), 4);
    }

    #[test]
    fn product_accepts_id_and_extra_attributes() {
        let product: Product = serde_json::from_str(
            r#"{"id": "9300000000001", "brand": "Sage", "title": "Sage Cooker",
                "price": "129,95", "features": ["slow cook", " sear "]}"#,
        )
        .expect("parse product");

        assert_eq!(product.id.as_deref(), Some("9300000000001"));
        assert_eq!(product.identifier(), Some("9300000000001"));
        assert_eq!(product.price(), Some(129.95));
        assert_eq!(product.features(), vec!["slow cook", "sear"]);
        assert_eq!(product.key(), "9300000000001");
        product.validate().expect("valid product");
    }

    #[test]
    fn product_with_ean_and_id_keeps_both() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "ean": "9312432031183", "id": "sku-1", "title": "Kettle"
        }))
        .expect("parse product");

        assert_eq!(product.ean.as_deref(), Some("9312432031183"));
        assert_eq!(product.id.as_deref(), Some("sku-1"));
        assert_eq!(product.identifier(), Some("9312432031183"));
        assert_eq!(product.key(), "9312432031183");
        assert!(!product.attributes.contains_key("id"));

        let blank_ean = Product {
            ean: Some("  ".into()),
            id: Some("sku-1".into()),
            ..Product::default()
        };
        assert_eq!(blank_ean.identifier(), Some("sku-1"));
        blank_ean.validate().expect("id is enough");
    }

    #[test]
    fn product_key_is_a_safe_file_name() {
        let product = Product {
            ean: Some("../../etc/passwd".into()),
            ..Product::default()
        };
        assert_eq!(product.key(), "etc-passwd");

        let nested = Product {
            id: Some("shop/sku 12".into()),
            ..Product::default()
        };
        assert_eq!(nested.key(), "shop-sku-12");
    }

    #[test]
    fn product_key_falls_back_to_title_slug() {
        let product = Product {
            title: Some("Sage  Fast Slow Pro!".into()),
            ..Product::default()
        };
        assert_eq!(product.key(), "sage-fast-slow-pro");
    }

    #[test]
    fn product_without_identity_is_rejected() {
        let product = Product {
            brand: Some("Sage".into()),
            ..Product::default()
        };
        assert!(product.validate().is_err());
    }
}
