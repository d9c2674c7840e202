//! Keyword research database payloads: keyword overview, related keywords and
//! competing domains.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use seocontext_shared::{SignalRecord, SourceId, SourceKind, metric};

use super::{de, parse_rows, raw_of};

const SOURCE: SourceId = SourceId::CompetitorDb;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompetitorDbReport {
    pub overview: Option<KeywordOverview>,
    pub related: Vec<RelatedKeyword>,
    pub competitors: Vec<CompetitorDomain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordOverview {
    #[serde(alias = "Keyword")]
    pub keyword: String,
    #[serde(default, alias = "Search Volume", deserialize_with = "de::number")]
    pub search_volume: f64,
    #[serde(default, alias = "CPC", deserialize_with = "de::opt_number")]
    pub cpc: Option<f64>,
    #[serde(default, alias = "Competition", deserialize_with = "de::opt_number")]
    pub competition: Option<f64>,
    #[serde(default, alias = "Number of Results", deserialize_with = "de::opt_number")]
    pub number_of_results: Option<f64>,
}

/// Export rows use spreadsheet-style column names; API rows use snake_case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedKeyword {
    #[serde(alias = "Keyword")]
    pub keyword: String,
    #[serde(default, alias = "Search Volume", deserialize_with = "de::number")]
    pub search_volume: f64,
    #[serde(default, alias = "Related Relevance", deserialize_with = "de::opt_number")]
    pub relevance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorDomain {
    #[serde(alias = "Domain")]
    pub domain: String,
    #[serde(default, alias = "Common Keywords", deserialize_with = "de::opt_number")]
    pub common_keywords: Option<f64>,
}

pub(super) fn parse(map: &Map<String, Value>) -> CompetitorDbReport {
    let overview = match map.get("keyword") {
        Some(Value::String(_)) => {
            let parsed: Vec<KeywordOverview> =
                parse_rows(SOURCE, Some(&Value::Object(map.clone())));
            parsed.into_iter().next()
        }
        _ => None,
    };

    let mut related: Vec<RelatedKeyword> = parse_rows(SOURCE, map.get("related_keywords"));
    related.extend(parse_rows::<RelatedKeyword>(SOURCE, map.get("related_keywords_raw")));

    let competitors = parse_rows(SOURCE, map.get("competitors"));

    CompetitorDbReport {
        overview,
        related,
        competitors,
    }
}

impl CompetitorDbReport {
    pub fn is_empty(&self) -> bool {
        self.overview.is_none() && self.related.is_empty() && self.competitors.is_empty()
    }

    /// The overview keyword feeds `competitor-db`; related keywords feed `raw-related`.
    pub fn signal_records(&self) -> Vec<SignalRecord> {
        let mut records = Vec::new();

        if let Some(o) = self.overview.as_ref().filter(|o| !o.keyword.trim().is_empty()) {
            let mut record = SignalRecord::new(o.keyword.clone(), SourceKind::CompetitorDb)
                .with_metric(metric::SEARCH_VOLUME, o.search_volume)
                .with_raw(raw_of(o));
            if let Some(cpc) = o.cpc {
                record.metrics.set(metric::CPC, cpc);
            }
            if let Some(competition) = o.competition {
                record.metrics.set(metric::COMPETITION, competition);
            }
            records.push(record);
        }

        for r in self.related.iter().filter(|r| !r.keyword.trim().is_empty()) {
            let mut record = SignalRecord::new(r.keyword.clone(), SourceKind::RawRelated)
                .with_metric(metric::SEARCH_VOLUME, r.search_volume)
                .with_raw(raw_of(r));
            if let Some(relevance) = r.relevance {
                record.metrics.set(metric::RELEVANCE, relevance);
            }
            records.push(record);
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overview_and_related_rows() {
        let raw = json!({
            "keyword": "sage cooker",
            "search_volume": "1300",
            "cpc": 0.82,
            "competition": 0.41,
            "related_keywords_raw": [
                {"Keyword": "sage slow cooker", "Search Volume": "480", "Related Relevance": "0.75"},
                {"Search Volume": "10"}
            ],
            "competitors": [{"domain": "kitchenstore.example"}, {"Domain": "cookshop.example", "Common Keywords": 14}]
        });
        let report = parse(raw.as_object().expect("object"));
        let records = report.signal_records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, SourceKind::CompetitorDb);
        assert_eq!(records[0].metrics.get(metric::SEARCH_VOLUME), 1300.0);
        assert_eq!(records[1].source, SourceKind::RawRelated);
        assert_eq!(records[1].term, "sage slow cooker");
        assert_eq!(records[1].metrics.get(metric::RELEVANCE), 0.75);
        assert_eq!(report.competitors.len(), 2);
        assert_eq!(report.competitors[1].common_keywords, Some(14.0));
    }

    #[test]
    fn single_related_object_is_accepted() {
        let raw = json!({"related_keywords_raw": {"Keyword": "sage cooker review", "Search Volume": 90}});
        let report = parse(raw.as_object().expect("object"));
        assert!(report.overview.is_none());
        assert_eq!(report.related.len(), 1);
        assert!(!report.is_empty());
    }
}
