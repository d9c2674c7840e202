//! Search-interest trend payloads: interest over time and related queries.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use seocontext_shared::{SignalRecord, SourceId, SourceKind, metric};

use super::{de, lookup, month_name, parse_rows, parse_section, raw_of};

const SOURCE: SourceId = SourceId::TrendService;

/// Rising when the latest point beats the early-window mean by this factor.
const RISING_RATIO: f64 = 1.2;
/// Rising needs more points than this.
const RISING_MIN_POINTS: usize = 10;
const SEASONAL_RATIO: f64 = 1.5;
/// With a zero-interest month, the peak alone must clear this.
const SEASONAL_MIN_PEAK: f64 = 10.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendReport {
    pub interest: Vec<InterestPoint>,
    pub top_queries: Vec<RelatedQuery>,
    pub rising_queries: Vec<RelatedQuery>,
    pub is_rising: bool,
    pub seasonality: Option<TrendSeasonality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPoint {
    pub date: String,
    #[serde(deserialize_with = "de::number")]
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedQuery {
    pub query: String,
    #[serde(default, deserialize_with = "de::number")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendSeasonality {
    #[serde(default)]
    pub is_seasonal: bool,
    #[serde(default)]
    pub peak_month: Option<String>,
    /// Average interest per calendar month, keyed `"01"`..`"12"`.
    #[serde(default)]
    pub monthly_averages: BTreeMap<String, f64>,
}

pub(super) fn parse(map: &Map<String, Value>) -> TrendReport {
    let interest: Vec<InterestPoint> = parse_rows(SOURCE, map.get("interest_over_time"));
    let top_queries = parse_rows(SOURCE, lookup(map, &["related_queries", "top"]));
    let rising_queries = parse_rows(SOURCE, lookup(map, &["related_queries", "rising"]));

    let is_rising = match map.get("is_rising").and_then(Value::as_bool) {
        Some(flag) => flag,
        None => rising(&interest),
    };
    let seasonality = parse_section(SOURCE, "seasonality", map.get("seasonality"))
        .or_else(|| seasonality(&interest));

    TrendReport {
        interest,
        top_queries,
        rising_queries,
        is_rising,
        seasonality,
    }
}

fn rising(points: &[InterestPoint]) -> bool {
    if points.len() <= RISING_MIN_POINTS {
        return false;
    }
    let half = &points[..points.len() / 2];
    let mean = half.iter().map(|p| p.value).sum::<f64>() / half.len() as f64;
    points
        .last()
        .is_some_and(|last| last.value > mean * RISING_RATIO)
}

/// Needs a full calendar year of coverage to say anything.
fn seasonality(points: &[InterestPoint]) -> Option<TrendSeasonality> {
    let mut months: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for point in points {
        let Some(Ok(date)) = point
            .date
            .get(..10)
            .map(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d"))
        else {
            continue;
        };
        let entry = months.entry(date.month()).or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }
    if months.len() < 12 {
        return None;
    }

    let averages: Vec<(u32, f64)> = months
        .into_iter()
        .map(|(m, (total, n))| (m, total / n as f64))
        .collect();
    let peak = averages.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1))?;
    let lowest = averages.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1))?;

    let is_seasonal = if lowest.1 > 0.0 {
        peak.1 > lowest.1 * SEASONAL_RATIO
    } else {
        peak.1 > SEASONAL_MIN_PEAK
    };

    Some(TrendSeasonality {
        is_seasonal,
        peak_month: month_name(peak.0),
        monthly_averages: averages
            .into_iter()
            .map(|(m, avg)| (format!("{m:02}"), avg))
            .collect(),
    })
}

impl TrendReport {
    pub fn is_empty(&self) -> bool {
        self.interest.is_empty() && self.top_queries.is_empty() && self.rising_queries.is_empty()
    }

    /// Top and rising related queries, rising ones flagged with the `rising` metric.
    ///
    /// A query listed as both keeps only its rising entry, so its value and
    /// flag come from the same row.
    pub fn signal_records(&self) -> Vec<SignalRecord> {
        let rising_terms: HashSet<String> = self
            .rising_queries
            .iter()
            .map(|q| q.query.trim().to_lowercase())
            .collect();
        let top = self
            .top_queries
            .iter()
            .filter(|q| !rising_terms.contains(&q.query.trim().to_lowercase()))
            .map(|q| (q, false));
        let rising = self.rising_queries.iter().map(|q| (q, true));

        top.chain(rising)
            .filter(|(q, _)| !q.query.trim().is_empty())
            .map(|(q, is_rising)| {
                let record = SignalRecord::new(q.query.clone(), SourceKind::TrendService)
                    .with_metric(metric::VALUE, q.value)
                    .with_raw(raw_of(q));
                if is_rising {
                    record.with_metric(metric::RISING, 1.0)
                } else {
                    record
                }
            })
            .collect()
    }
}
