//! Merchant platform payloads: listing issues, shopping performance and price benchmarks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use seocontext_shared::{IssueSeverity, PriceRange, SourceId};

use super::{de, lookup, parse_rows, parse_section};

const SOURCE: SourceId = SourceId::MerchantCenter;

/// Prices within this fraction of a benchmark count as "average".
const PRICE_BAND: f64 = 0.10;

// ---------------------------------------------------------------------------
// Price position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricePosition {
    AboveAverage,
    Average,
    BelowAverage,
}

impl PricePosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AboveAverage => "above_average",
            Self::Average => "average",
            Self::BelowAverage => "below_average",
        }
    }
}

/// Where `price` sits relative to `benchmark`, with a ±10% band around it.
pub fn relative_position(price: f64, benchmark: f64) -> PricePosition {
    if price > benchmark * (1.0 + PRICE_BAND) {
        PricePosition::AboveAverage
    } else if price < benchmark * (1.0 - PRICE_BAND) {
        PricePosition::BelowAverage
    } else {
        PricePosition::Average
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct MerchantReport {
    /// Sorted by severity rank, payload order within a rank.
    pub issues: Vec<ProductIssue>,
    pub metrics: Option<ShoppingMetrics>,
    pub price: Option<PriceCompetitiveness>,
    pub category_range: Option<PriceRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductIssue {
    #[serde(default)]
    pub code: String,
    pub severity: IssueSeverity,
    #[serde(default, alias = "detail")]
    pub description: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShoppingMetrics {
    #[serde(default, deserialize_with = "de::opt_number")]
    pub impressions: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub clicks: Option<f64>,
    /// Percent.
    #[serde(default, deserialize_with = "de::opt_number")]
    pub ctr: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub conversions: Option<f64>,
    /// Percent.
    #[serde(default, deserialize_with = "de::opt_number")]
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCompetitiveness {
    #[serde(default, deserialize_with = "de::opt_number")]
    pub price_benchmark: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub product_price: Option<f64>,
    #[serde(default)]
    pub relative_position: Option<PricePosition>,
}

#[derive(Debug, Deserialize)]
struct RangeRow {
    #[serde(deserialize_with = "de::number")]
    min: f64,
    #[serde(deserialize_with = "de::number")]
    max: f64,
    #[serde(default, deserialize_with = "de::opt_number")]
    median: Option<f64>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub(super) fn parse(map: &Map<String, Value>) -> MerchantReport {
    let mut issues: Vec<ProductIssue> = parse_rows(
        SOURCE,
        lookup(map, &["product_issues", "issues"]).or_else(|| map.get("issues")),
    );
    issues.sort_by_key(|issue| issue.severity.rank());

    let metrics: Option<ShoppingMetrics> = parse_section(
        SOURCE,
        "performance_report",
        lookup(map, &["performance_report", "metrics"]),
    );

    let mut price: Option<PriceCompetitiveness> = parse_section(
        SOURCE,
        "price_competitiveness",
        lookup(map, &["price_insights", "price_competitiveness"]),
    );
    if let Some(p) = price.as_mut() {
        if p.relative_position.is_none() {
            if let (Some(product), Some(benchmark)) = (p.product_price, p.price_benchmark) {
                p.relative_position = Some(relative_position(product, benchmark));
            }
        }
    }

    let category_range = parse_section::<RangeRow>(
        SOURCE,
        "category_price_range",
        lookup(map, &["price_insights", "category_price_range"]),
    )
    .map(|r| PriceRange {
        min: r.min,
        max: r.max,
        median: r.median,
    });

    MerchantReport {
        issues,
        metrics,
        price,
        category_range,
    }
}

impl MerchantReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
            && self.metrics.is_none()
            && self.price.is_none()
            && self.category_range.is_none()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Critical)
    }
}
