//! Search console payloads: per-query search performance and click opportunities.
//!
//! CTR values are percentages throughout (2.0 means 2%).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use seocontext_shared::{CtrOpportunity, SignalRecord, SourceId, SourceKind, metric};

use super::{de, lookup, parse_rows, raw_of};

const SOURCE: SourceId = SourceId::SearchConsole;

/// Queries need more impressions than this to count as a CTR opportunity.
const OPPORTUNITY_MIN_IMPRESSIONS: f64 = 100.0;
/// ... and a CTR (percent) below this.
const OPPORTUNITY_MAX_CTR: f64 = 2.0;
/// Click-through rate assumed reachable for an improved snippet.
const TARGET_CTR: f64 = 0.05;
/// Average position at or above which a query already ranks on page one.
const PAGE_ONE_POSITION: f64 = 10.0;
const OPPORTUNITY_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchConsoleReport {
    pub queries: Vec<QueryRow>,
    pub totals: SearchTotals,
    pub dominant_device: Option<String>,
    pub high_impression_low_ctr: Vec<CtrOpportunity>,
    pub already_ranking: Vec<QueryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRow {
    #[serde(alias = "term", alias = "keyword")]
    pub query: String,
    #[serde(default, deserialize_with = "de::number")]
    pub impressions: f64,
    #[serde(default, deserialize_with = "de::number")]
    pub clicks: f64,
    #[serde(default, deserialize_with = "de::number")]
    pub ctr: f64,
    #[serde(default, alias = "position", deserialize_with = "de::number")]
    pub avg_position: f64,
    #[serde(default)]
    pub dominant_device: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchTotals {
    #[serde(default, alias = "total_impressions", deserialize_with = "de::opt_number")]
    pub impressions: Option<f64>,
    #[serde(default, alias = "total_clicks", deserialize_with = "de::opt_number")]
    pub clicks: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub avg_ctr: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub avg_position: Option<f64>,
}

/// Raw API row: `keys` holds the requested dimensions (query, device, ...).
#[derive(Debug, Deserialize)]
struct ApiRow {
    keys: Vec<String>,
    #[serde(default, deserialize_with = "de::number")]
    impressions: f64,
    #[serde(default, deserialize_with = "de::number")]
    clicks: f64,
    #[serde(default, deserialize_with = "de::number")]
    position: f64,
}

#[derive(Debug, Deserialize)]
struct OpportunityRow {
    query: String,
    #[serde(default, deserialize_with = "de::number")]
    impressions: f64,
    #[serde(default, alias = "ctr", deserialize_with = "de::number")]
    current_ctr: f64,
    #[serde(default, deserialize_with = "de::opt_number")]
    potential_clicks: Option<f64>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub(super) fn parse(map: &Map<String, Value>) -> SearchConsoleReport {
    let search_data = map.get("search_data").and_then(Value::as_object);

    let mut queries: Vec<QueryRow> =
        parse_rows(SOURCE, search_data.and_then(|d| d.get("queries")));
    let mut dominant_device = search_data
        .and_then(|d| d.get("dominant_device"))
        .and_then(Value::as_str)
        .map(String::from);

    if queries.is_empty() {
        let rows: Vec<ApiRow> = parse_rows(SOURCE, map.get("rows"));
        if !rows.is_empty() {
            dominant_device = dominant_device.or_else(|| busiest_device(&rows));
            queries = aggregate_rows(&rows);
        }
    }

    let mut totals: SearchTotals = search_data
        .and_then(|d| serde_json::from_value(Value::Object(d.clone())).ok())
        .unwrap_or_default();
    fill_totals(&mut totals, &queries);

    let high_impression_low_ctr = match lookup(map, &["keyword_opportunities", "high_impression_low_ctr"]) {
        Some(rows) => parse_rows::<OpportunityRow>(SOURCE, Some(rows))
            .into_iter()
            .map(|o| CtrOpportunity {
                potential_clicks: o.potential_clicks.unwrap_or(o.impressions * TARGET_CTR),
                query: o.query,
                impressions: o.impressions,
                current_ctr: o.current_ctr,
            })
            .collect(),
        None => low_ctr_opportunities(&queries),
    };

    let already_ranking = match lookup(map, &["keyword_opportunities", "already_ranking"]) {
        Some(rows) => parse_rows(SOURCE, Some(rows)),
        None => already_ranking(&queries),
    };

    SearchConsoleReport {
        queries,
        totals,
        dominant_device,
        high_impression_low_ctr,
        already_ranking,
    }
}

/// Collapse dimensioned API rows into one row per query.
fn aggregate_rows(rows: &[ApiRow]) -> Vec<QueryRow> {
    // (row, weighted position sum, per-device impressions)
    let mut grouped: Vec<(QueryRow, f64, Vec<(String, f64)>)> = Vec::new();

    for row in rows {
        let Some(query) = row.keys.first() else {
            continue;
        };
        let device = row.keys.get(1).cloned();
        let idx = match grouped.iter().position(|(q, _, _)| &q.query == query) {
            Some(idx) => idx,
            None => {
                grouped.push((
                    QueryRow {
                        query: query.clone(),
                        impressions: 0.0,
                        clicks: 0.0,
                        ctr: 0.0,
                        avg_position: 0.0,
                        dominant_device: None,
                    },
                    0.0,
                    Vec::new(),
                ));
                grouped.len() - 1
            }
        };
        let (q, position_sum, devices) = &mut grouped[idx];
        q.impressions += row.impressions;
        q.clicks += row.clicks;
        *position_sum += row.position * row.impressions;
        if let Some(device) = device {
            match devices.iter_mut().find(|(d, _)| *d == device) {
                Some((_, imps)) => *imps += row.impressions,
                None => devices.push((device, row.impressions)),
            }
        }
    }

    grouped
        .into_iter()
        .map(|(mut q, position_sum, devices)| {
            if q.impressions > 0.0 {
                q.ctr = q.clicks / q.impressions * 100.0;
                q.avg_position = position_sum / q.impressions;
            }
            q.dominant_device = max_by_value(&devices);
            q
        })
        .collect()
}

fn busiest_device(rows: &[ApiRow]) -> Option<String> {
    let mut devices: Vec<(String, f64)> = Vec::new();
    for row in rows {
        if let Some(device) = row.keys.get(1) {
            match devices.iter_mut().find(|(d, _)| d == device) {
                Some((_, imps)) => *imps += row.impressions,
                None => devices.push((device.clone(), row.impressions)),
            }
        }
    }
    max_by_value(&devices)
}

/// First entry with the highest value.
fn max_by_value(entries: &[(String, f64)]) -> Option<String> {
    entries
        .iter()
        .fold(None::<&(String, f64)>, |best, cur| match best {
            Some(b) if b.1 >= cur.1 => Some(b),
            _ => Some(cur),
        })
        .map(|(name, _)| name.clone())
}

fn fill_totals(totals: &mut SearchTotals, queries: &[QueryRow]) {
    if queries.is_empty() {
        return;
    }
    let impressions: f64 = queries.iter().map(|q| q.impressions).sum();
    let clicks: f64 = queries.iter().map(|q| q.clicks).sum();

    totals.impressions.get_or_insert(impressions);
    totals.clicks.get_or_insert(clicks);
    if totals.avg_ctr.is_none() && impressions > 0.0 {
        totals.avg_ctr = Some(clicks / impressions * 100.0);
    }
    if totals.avg_position.is_none() {
        totals.avg_position =
            Some(queries.iter().map(|q| q.avg_position).sum::<f64>() / queries.len() as f64);
    }
}

/// Queries seen often but rarely clicked, busiest first.
pub fn low_ctr_opportunities(queries: &[QueryRow]) -> Vec<CtrOpportunity> {
    let mut found: Vec<CtrOpportunity> = queries
        .iter()
        .filter(|q| q.impressions > OPPORTUNITY_MIN_IMPRESSIONS && q.ctr < OPPORTUNITY_MAX_CTR)
        .map(|q| CtrOpportunity {
            query: q.query.clone(),
            impressions: q.impressions,
            current_ctr: q.ctr,
            potential_clicks: q.impressions * TARGET_CTR,
        })
        .collect();
    found.sort_by(|a, b| b.impressions.total_cmp(&a.impressions));
    found.truncate(OPPORTUNITY_LIMIT);
    found
}

/// Queries already on page one, busiest first.
pub fn already_ranking(queries: &[QueryRow]) -> Vec<QueryRow> {
    let mut found: Vec<QueryRow> = queries
        .iter()
        .filter(|q| q.avg_position > 0.0 && q.avg_position <= PAGE_ONE_POSITION)
        .cloned()
        .collect();
    found.sort_by(|a, b| b.impressions.total_cmp(&a.impressions));
    found.truncate(OPPORTUNITY_LIMIT);
    found
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

impl SearchConsoleReport {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.totals.impressions.is_none()
    }

    pub fn signal_records(&self) -> Vec<SignalRecord> {
        self.queries
            .iter()
            .filter(|q| !q.query.trim().is_empty())
            .map(|q| {
                SignalRecord::new(q.query.clone(), SourceKind::SearchConsole)
                    .with_metric(metric::CLICKS, q.clicks)
                    .with_metric(metric::IMPRESSIONS, q.impressions)
                    .with_metric(metric::CTR, q.ctr)
                    .with_metric(metric::AVG_POSITION, q.avg_position)
                    .with_raw(raw_of(q))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_value(raw: Value) -> SearchConsoleReport {
        parse(raw.as_object().expect("object"))
    }

    #[test]
    fn query_rows_become_search_console_signals() {
        let report = parse_value(json!({
            "search_data": {
                "total_impressions": 500,
                "queries": [{"query": "sage cooker", "impressions": 500, "clicks": 40, "ctr": 8.0, "avg_position": 3.2}]
            }
        }));
        let records = report.signal_records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, SourceKind::SearchConsole);
        assert_eq!(records[0].metrics.get(metric::CLICKS), 40.0);
        assert_eq!(records[0].metrics.get(metric::IMPRESSIONS), 500.0);
        assert_eq!(report.totals.impressions, Some(500.0));
        assert_eq!(report.totals.clicks, Some(40.0));
    }

    #[test]
    fn opportunities_derived_from_queries() {
        let report = parse_value(json!({
            "search_data": {"queries": [
                {"query": "slow cooker", "impressions": 2000, "clicks": 10, "ctr": 0.5, "avg_position": 14.0},
                {"query": "sage cooker", "impressions": 500, "clicks": 40, "ctr": 8.0, "avg_position": 3.2},
                {"query": "pressure cooker", "impressions": 90, "clicks": 0, "ctr": 0.0, "avg_position": 30.0},
                {"query": "multicooker", "impressions": 3000, "clicks": 30, "ctr": 1.0, "avg_position": 8.0}
            ]}
        }));

        let low: Vec<&str> = report
            .high_impression_low_ctr
            .iter()
            .map(|o| o.query.as_str())
            .collect();
        assert_eq!(low, vec!["multicooker", "slow cooker"]);
        assert_eq!(report.high_impression_low_ctr[1].potential_clicks, 100.0);

        let ranking: Vec<&str> = report.already_ranking.iter().map(|q| q.query.as_str()).collect();
        assert_eq!(ranking, vec!["multicooker", "sage cooker"]);
    }

    #[test]
    fn api_rows_are_grouped_per_query() {
        let report = parse_value(json!({
            "rows": [
                {"keys": ["sage cooker", "MOBILE"], "impressions": 300, "clicks": 30, "position": 2.0},
                {"keys": ["sage cooker", "DESKTOP"], "impressions": 100, "clicks": 10, "position": 6.0},
                {"keys": ["slow cooker", "DESKTOP"], "impressions": 400, "clicks": 4, "position": 12.0},
                {"keys": [], "impressions": 5}
            ]
        }));

        assert_eq!(report.queries.len(), 2);
        let sage = &report.queries[0];
        assert_eq!(sage.impressions, 400.0);
        assert!((sage.ctr - 10.0).abs() < 1e-9);
        assert!((sage.avg_position - 3.0).abs() < 1e-9);
        assert_eq!(sage.dominant_device.as_deref(), Some("MOBILE"));
        assert_eq!(report.dominant_device.as_deref(), Some("DESKTOP"));
        assert_eq!(report.totals.impressions, Some(800.0));
    }
}
