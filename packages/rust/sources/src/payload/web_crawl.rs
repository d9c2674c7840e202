//! Competitor page crawl payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use seocontext_shared::SourceId;

use super::{de, parse_rows};

const SOURCE: SourceId = SourceId::WebCrawl;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WebCrawlReport {
    pub pages: Vec<CompetitorPage>,
}

/// One crawled competitor product page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorPage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub price: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CompetitorPage {
    /// Display name: the declared name, else the page's host without `www.`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        let url = Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(host.trim_start_matches("www.").to_string())
    }
}

pub(super) fn parse(map: &Map<String, Value>) -> WebCrawlReport {
    let rows = map
        .get("pages")
        .or_else(|| map.get("competitors"))
        .or_else(|| map.get("results"));
    WebCrawlReport {
        pages: parse_rows(SOURCE, rows),
    }
}

impl WebCrawlReport {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
