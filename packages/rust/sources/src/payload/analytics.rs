//! Web analytics payloads: brand keyword performance plus product traffic metrics.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use seocontext_shared::{SignalRecord, SourceId, SourceKind, UserSegment, metric};

use super::{de, lookup, month_name, parse_rows, parse_section, raw_of};

const SOURCE: SourceId = SourceId::Analytics;

/// Peak monthly traffic must exceed the quietest month by this factor to count as seasonal.
const SEASONAL_RATIO: f64 = 1.5;

/// Growth (percent) beyond which traffic is called growing or declining.
const TREND_THRESHOLD_PCT: f64 = 5.0;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsReport {
    pub brand_keywords: Vec<BrandKeyword>,
    pub traffic: Option<TrafficPatterns>,
    pub conversion: Option<ConversionMetrics>,
    pub seasonality: Option<AnalyticsSeasonality>,
    /// Every device x source segment; ranking happens at extraction.
    pub user_segments: Vec<UserSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandKeyword {
    #[serde(alias = "keyword", alias = "query")]
    pub term: String,
    #[serde(default, deserialize_with = "de::number")]
    pub views: f64,
    #[serde(default, deserialize_with = "de::number")]
    pub sessions: f64,
    #[serde(default, deserialize_with = "de::number")]
    pub conversions: f64,
    /// Percent.
    #[serde(default, deserialize_with = "de::opt_number")]
    pub conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficPatterns {
    #[serde(default)]
    pub top_sources: Vec<TrafficSource>,
    #[serde(default)]
    pub device_preference: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub growth_rate: Option<f64>,
    #[serde(default, alias = "traffic_trend")]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSource {
    pub source: String,
    #[serde(default, deserialize_with = "de::number")]
    pub views: f64,
    #[serde(default, deserialize_with = "de::number")]
    pub users: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionMetrics {
    #[serde(default, deserialize_with = "de::opt_number")]
    pub conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub cart_abandonment_rate: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub revenue_per_view: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSeasonality {
    #[serde(default)]
    pub is_seasonal: bool,
    #[serde(default)]
    pub peak_month: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub peak_value: Option<f64>,
    #[serde(default)]
    pub lowest_month: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub lowest_value: Option<f64>,
}

/// One day of product traffic for one device and traffic source.
#[derive(Debug, Clone, Deserialize)]
struct DailyRow {
    date: String,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, deserialize_with = "de::number")]
    views: f64,
    #[serde(default, deserialize_with = "de::number")]
    users: f64,
    #[serde(default, deserialize_with = "de::number")]
    conversions: f64,
    #[serde(default, alias = "avg_session_duration", deserialize_with = "de::number")]
    avg_duration: f64,
}

/// Wire shape of a pre-computed segment.
#[derive(Debug, Deserialize)]
struct SegmentRow {
    device: String,
    source: String,
    #[serde(default, deserialize_with = "de::number")]
    users: f64,
    #[serde(default, deserialize_with = "de::number")]
    conversions: f64,
    #[serde(default, deserialize_with = "de::number")]
    avg_duration: f64,
    #[serde(default, deserialize_with = "de::opt_number")]
    conversion_rate: Option<f64>,
}

impl From<SegmentRow> for UserSegment {
    fn from(row: SegmentRow) -> Self {
        let conversion_rate = row
            .conversion_rate
            .unwrap_or_else(|| rate(row.conversions, row.users));
        UserSegment {
            device: row.device,
            source: row.source,
            users: row.users,
            conversions: row.conversions,
            avg_duration: row.avg_duration,
            conversion_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub(super) fn parse(map: &Map<String, Value>) -> AnalyticsReport {
    let brand_keywords = parse_rows(
        SOURCE,
        lookup(map, &["brand_keywords", "keywords"]).or_else(|| map.get("brand_keywords")),
    );

    let mut report = AnalyticsReport {
        brand_keywords,
        traffic: parse_section(
            SOURCE,
            "traffic_patterns",
            lookup(map, &["performance_metrics", "traffic_patterns"]),
        ),
        conversion: parse_section(
            SOURCE,
            "conversion_metrics",
            lookup(map, &["performance_metrics", "conversion_metrics"]),
        ),
        seasonality: parse_section(
            SOURCE,
            "seasonal_trends",
            lookup(map, &["performance_metrics", "seasonal_trends"]),
        ),
        user_segments: parse_rows::<SegmentRow>(
            SOURCE,
            lookup(map, &["performance_metrics", "user_segments", "high_value_segments"]),
        )
        .into_iter()
        .map(UserSegment::from)
        .collect(),
    };

    let rows: Vec<DailyRow> = parse_rows(SOURCE, map.get("rows"));
    if !rows.is_empty() {
        fill_from_rows(&mut report, &rows);
    }

    report
}

/// Derive any performance block the payload did not carry from daily rows.
fn fill_from_rows(report: &mut AnalyticsReport, rows: &[DailyRow]) {
    if report.traffic.is_none() {
        report.traffic = Some(traffic_patterns(rows));
    }
    if report.conversion.is_none() {
        let users: f64 = rows.iter().map(|r| r.users).sum();
        let conversions: f64 = rows.iter().map(|r| r.conversions).sum();
        report.conversion = Some(ConversionMetrics {
            conversion_rate: (users > 0.0).then(|| rate(conversions, users)),
            ..ConversionMetrics::default()
        });
    }
    if report.seasonality.is_none() {
        report.seasonality = seasonality(rows);
    }
    if report.user_segments.is_empty() {
        report.user_segments = user_segments(rows);
    }
}

fn traffic_patterns(rows: &[DailyRow]) -> TrafficPatterns {
    let mut by_source: Vec<TrafficSource> = Vec::new();
    let mut by_device: Vec<(String, f64)> = Vec::new();

    for row in rows {
        let source = row.source.clone().unwrap_or_else(|| "(direct)".into());
        match by_source.iter_mut().find(|s| s.source == source) {
            Some(entry) => {
                entry.views += row.views;
                entry.users += row.users;
            }
            None => by_source.push(TrafficSource {
                source,
                views: row.views,
                users: row.users,
            }),
        }

        if let Some(device) = &row.device {
            match by_device.iter_mut().find(|(d, _)| d == device) {
                Some((_, views)) => *views += row.views,
                None => by_device.push((device.clone(), row.views)),
            }
        }
    }

    by_source.sort_by(|a, b| b.views.total_cmp(&a.views));
    by_source.truncate(3);

    let device_preference = by_device
        .iter()
        .fold(None::<&(String, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(device, _)| device.clone());

    // Compare the later half of the window against the earlier half.
    let mut dated: Vec<(NaiveDate, f64)> = rows
        .iter()
        .filter_map(|r| parse_date(&r.date).map(|d| (d, r.views)))
        .collect();
    dated.sort_by_key(|(d, _)| *d);
    let mid = dated.len() / 2;
    let first: f64 = dated[..mid].iter().map(|(_, v)| v).sum();
    let second: f64 = dated[mid..].iter().map(|(_, v)| v).sum();
    let growth_rate = (first > 0.0).then(|| (second - first) / first * 100.0);
    let trend = growth_rate.map(|g| {
        if g > TREND_THRESHOLD_PCT {
            "growing"
        } else if g < -TREND_THRESHOLD_PCT {
            "declining"
        } else {
            "stable"
        }
        .to_string()
    });

    TrafficPatterns {
        top_sources: by_source,
        device_preference,
        growth_rate,
        trend,
    }
}

/// Monthly average daily views; seasonal when the busiest month clearly beats the quietest.
fn seasonality(rows: &[DailyRow]) -> Option<AnalyticsSeasonality> {
    let mut months: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let Some(date) = parse_date(&row.date) else {
            debug!(date = %row.date, "unparseable analytics date, ignoring row for seasonality");
            continue;
        };
        let entry = months.entry(date.month()).or_insert((0.0, 0));
        entry.0 += row.views;
        entry.1 += 1;
    }
    if months.len() < 2 {
        return None;
    }

    let averages: Vec<(u32, f64)> = months
        .into_iter()
        .map(|(m, (total, days))| (m, total / days as f64))
        .collect();
    let peak = averages.iter().copied().max_by(|a, b| a.1.total_cmp(&b.1))?;
    let lowest = averages.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1))?;

    Some(AnalyticsSeasonality {
        is_seasonal: peak.1 > lowest.1 * SEASONAL_RATIO,
        peak_month: month_name(peak.0),
        peak_value: Some(peak.1),
        lowest_month: month_name(lowest.0),
        lowest_value: Some(lowest.1),
    })
}

fn user_segments(rows: &[DailyRow]) -> Vec<UserSegment> {
    let mut segments: Vec<(UserSegment, usize)> = Vec::new();
    for row in rows {
        let device = row.device.clone().unwrap_or_else(|| "unknown".into());
        let source = row.source.clone().unwrap_or_else(|| "(direct)".into());
        match segments
            .iter_mut()
            .find(|(s, _)| s.device == device && s.source == source)
        {
            Some((seg, days)) => {
                seg.users += row.users;
                seg.conversions += row.conversions;
                seg.avg_duration += row.avg_duration;
                *days += 1;
            }
            None => segments.push((
                UserSegment {
                    device,
                    source,
                    users: row.users,
                    conversions: row.conversions,
                    avg_duration: row.avg_duration,
                    conversion_rate: 0.0,
                },
                1,
            )),
        }
    }

    segments
        .into_iter()
        .map(|(mut seg, days)| {
            seg.avg_duration /= days as f64;
            seg.conversion_rate = rate(seg.conversions, seg.users);
            seg
        })
        .collect()
}

/// Percentage, 0 when the denominator is 0.
fn rate(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

impl AnalyticsReport {
    pub fn is_empty(&self) -> bool {
        self.brand_keywords.is_empty()
            && self.traffic.is_none()
            && self.conversion.is_none()
            && self.seasonality.is_none()
            && self.user_segments.is_empty()
    }

    pub fn signal_records(&self) -> Vec<SignalRecord> {
        self.brand_keywords
            .iter()
            .filter(|k| !k.term.trim().is_empty())
            .map(|k| {
                let mut record = SignalRecord::new(k.term.clone(), SourceKind::Analytics)
                    .with_metric(metric::SESSIONS, k.sessions)
                    .with_metric(metric::CONVERSIONS, k.conversions)
                    .with_metric(metric::VIEWS, k.views)
                    .with_raw(raw_of(k));
                if let Some(rate) = k.conversion_rate {
                    record.metrics.set(metric::CONVERSION_RATE, rate);
                }
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_value(raw: Value) -> AnalyticsReport {
        parse(raw.as_object().expect("object"))
    }

    #[test]
    fn brand_keywords_become_analytics_signals() {
        let report = parse_value(json!({
            "brand_keywords": {"keywords": [
                {"term": "sage cooker", "sessions": "980", "conversions": 58, "views": 1500, "conversion_rate": 5.9},
                {"term": "  ", "sessions": 3}
            ]}
        }));
        let records = report.signal_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, SourceKind::Analytics);
        assert_eq!(records[0].metrics.get(metric::SESSIONS), 980.0);
        assert_eq!(records[0].metrics.get(metric::CONVERSIONS), 58.0);
        assert_eq!(records[0].raw["term"], "sage cooker");
    }

    #[test]
    fn precomputed_performance_blocks_are_used() {
        let report = parse_value(json!({
            "performance_metrics": {
                "conversion_metrics": {"conversion_rate": 3.2, "cart_abandonment_rate": 61.0},
                "seasonal_trends": {"is_seasonal": true, "peak_month": "December"},
                "user_segments": {"high_value_segments": [
                    {"device": "mobile", "source": "google", "users": 120, "conversions": 6}
                ]}
            }
        }));

        assert_eq!(report.conversion.as_ref().and_then(|c| c.conversion_rate), Some(3.2));
        assert_eq!(
            report.seasonality.as_ref().and_then(|s| s.peak_month.as_deref()),
            Some("December")
        );
        assert_eq!(report.user_segments.len(), 1);
        assert!((report.user_segments[0].conversion_rate - 5.0).abs() < 1e-9);
    }

    #[test]
    fn daily_rows_derive_missing_blocks() {
        let report = parse_value(json!({
            "rows": [
                {"date": "20251101", "device": "mobile", "source": "google", "views": 100, "users": 50, "conversions": 2},
                {"date": "20251102", "device": "desktop", "source": "google", "views": 40, "users": 20, "conversions": 2},
                {"date": "20251201", "device": "mobile", "source": "google", "views": 300, "users": 150, "conversions": 3},
                {"date": "20251202", "device": "mobile", "source": "newsletter", "views": 320, "users": 100, "conversions": 10}
            ]
        }));

        let seasonality = report.seasonality.expect("derived seasonality");
        assert!(seasonality.is_seasonal);
        assert_eq!(seasonality.peak_month.as_deref(), Some("December"));
        assert_eq!(seasonality.lowest_month.as_deref(), Some("November"));

        let traffic = report.traffic.expect("derived traffic");
        assert_eq!(traffic.device_preference.as_deref(), Some("mobile"));
        assert_eq!(traffic.top_sources[0].source, "google");
        assert_eq!(traffic.trend.as_deref(), Some("growing"));

        assert_eq!(report.user_segments.len(), 3);
        let newsletter = report
            .user_segments
            .iter()
            .find(|s| s.source == "newsletter")
            .expect("newsletter segment");
        assert!((newsletter.conversion_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_month_is_not_enough_for_seasonality() {
        let report = parse_value(json!({
            "rows": [{"date": "20251101", "views": 10}, {"date": "2025-11-02", "views": 12}]
        }));
        assert!(report.seasonality.is_none());
    }
}
