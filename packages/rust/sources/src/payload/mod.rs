//! Typed parsing of source payloads.
//!
//! Every connector hands back loosely-shaped JSON. This module turns it into
//! one typed report per source, skipping rows that fail to parse, and derives
//! summary blocks from raw rows when a payload only carries the rows.

pub mod analytics;
pub mod competitor_db;
pub mod merchant;
pub mod search_console;
pub mod trends;
pub mod web_crawl;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use seocontext_shared::{Result, SeoContextError, SignalRecord, SourceId};

pub use analytics::AnalyticsReport;
pub use competitor_db::CompetitorDbReport;
pub use merchant::MerchantReport;
pub use search_console::SearchConsoleReport;
pub use trends::TrendReport;
pub use web_crawl::WebCrawlReport;

// ---------------------------------------------------------------------------
// SourcePayload
// ---------------------------------------------------------------------------

/// A parsed payload from one data source.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourcePayload {
    Analytics(AnalyticsReport),
    SearchConsole(SearchConsoleReport),
    MerchantCenter(MerchantReport),
    CompetitorDb(CompetitorDbReport),
    TrendService(TrendReport),
    WebCrawl(WebCrawlReport),
}

impl SourcePayload {
    /// Parse a raw payload for `source`.
    ///
    /// - `{"error": ...}` is [`SeoContextError::SourceUnavailable`]
    /// - `{}`, `null`, or a payload whose rows were all unusable is
    ///   [`SeoContextError::EmptyResult`]
    /// - individual bad rows are dropped with a warning
    pub fn parse(source: SourceId, raw: &Value) -> Result<Self> {
        let map = envelope(source, raw)?;
        let payload = match source {
            SourceId::Analytics => Self::Analytics(analytics::parse(map)),
            SourceId::SearchConsole => Self::SearchConsole(search_console::parse(map)),
            SourceId::MerchantCenter => Self::MerchantCenter(merchant::parse(map)),
            SourceId::CompetitorDb => Self::CompetitorDb(competitor_db::parse(map)),
            SourceId::TrendService => Self::TrendService(trends::parse(map)),
            SourceId::WebCrawl => Self::WebCrawl(web_crawl::parse(map)),
        };

        if payload.is_empty() {
            return Err(SeoContextError::empty_result(source.as_str()));
        }
        Ok(payload)
    }

    pub fn source_id(&self) -> SourceId {
        match self {
            Self::Analytics(_) => SourceId::Analytics,
            Self::SearchConsole(_) => SourceId::SearchConsole,
            Self::MerchantCenter(_) => SourceId::MerchantCenter,
            Self::CompetitorDb(_) => SourceId::CompetitorDb,
            Self::TrendService(_) => SourceId::TrendService,
            Self::WebCrawl(_) => SourceId::WebCrawl,
        }
    }

    /// Whether the report carries nothing usable.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Analytics(r) => r.is_empty(),
            Self::SearchConsole(r) => r.is_empty(),
            Self::MerchantCenter(r) => r.is_empty(),
            Self::CompetitorDb(r) => r.is_empty(),
            Self::TrendService(r) => r.is_empty(),
            Self::WebCrawl(r) => r.is_empty(),
        }
    }

    /// Keyword signals carried by this payload. Sources without keyword data
    /// yield nothing.
    pub fn signal_records(&self) -> Vec<SignalRecord> {
        match self {
            Self::Analytics(r) => r.signal_records(),
            Self::SearchConsole(r) => r.signal_records(),
            Self::CompetitorDb(r) => r.signal_records(),
            Self::TrendService(r) => r.signal_records(),
            Self::MerchantCenter(_) | Self::WebCrawl(_) => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Unwrap the top-level object, mapping error and empty envelopes.
fn envelope(source: SourceId, raw: &Value) -> Result<&Map<String, Value>> {
    match raw {
        Value::Object(map) => {
            if let Some(err) = map.get("error") {
                let message = match err {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(SeoContextError::source_unavailable(source.as_str(), message));
            }
            if map.is_empty() {
                return Err(SeoContextError::empty_result(source.as_str()));
            }
            Ok(map)
        }
        Value::Null => Err(SeoContextError::empty_result(source.as_str())),
        _ => Err(SeoContextError::validation(format!(
            "{source} payload must be a JSON object"
        ))),
    }
}

/// Parse each row independently. Rows that fail are logged and skipped.
pub(crate) fn parse_rows<T: DeserializeOwned>(source: SourceId, rows: Option<&Value>) -> Vec<T> {
    let rows: Vec<&Value> = match rows {
        Some(Value::Array(items)) => items.iter().collect(),
        // A single object where a list is expected is one row.
        Some(obj @ Value::Object(_)) => vec![obj],
        Some(Value::Null) | None => return Vec::new(),
        Some(other) => {
            let err = SeoContextError::malformed_row(
                source.as_str(),
                format!("expected a list of rows, got {other}"),
            );
            warn!(source = %source, error = %err, "skipping row block");
            return Vec::new();
        }
    };

    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<T>(row.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                let err = SeoContextError::malformed_row(source.as_str(), e.to_string());
                warn!(source = %source, index, error = %err, "skipping malformed row");
                None
            }
        })
        .collect()
}

/// Parse an optional nested section. A malformed section is logged and treated as absent.
pub(crate) fn parse_section<T: DeserializeOwned>(
    source: SourceId,
    name: &str,
    value: Option<&Value>,
) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(source = %source, section = name, error = %e, "ignoring malformed section");
            None
        }
    }
}

/// Follow a path of object keys.
pub(crate) fn lookup<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(map.get(*first)?, |value, key| value.get(*key))
}

/// Serialize a parsed row back into JSON for `SignalRecord::raw`.
pub(crate) fn raw_of<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or_default()
}

/// English month name for a 1-based month number.
pub(crate) fn month_name(month: u32) -> Option<String> {
    let month = u8::try_from(month).ok()?;
    chrono::Month::try_from(month)
        .ok()
        .map(|m| m.name().to_string())
}

/// Lenient numeric deserializers. Analytics APIs routinely send numbers as strings.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_f64<E: serde::de::Error>(value: Value) -> Result<Option<f64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .trim_end_matches('%')
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| E::custom(format!("not a number: {s:?}"))),
            other => Err(E::custom(format!("not a number: {other}"))),
        }
    }

    /// Number or numeric string; missing and null become 0.
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(to_f64(Value::deserialize(d)?)?.unwrap_or(0.0))
    }

    /// Number or numeric string; missing and null stay `None`.
    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        to_f64(Value::deserialize(d)?)
    }
}
