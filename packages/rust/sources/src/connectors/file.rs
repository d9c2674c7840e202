//! Connector reading recorded payloads from disk.
//!
//! Layout under the configured directory:
//!
//! ```text
//! <dir>/<product-key>/<source>.json   per-product payload
//! <dir>/<source>.json                 fallback shared by every product
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use seocontext_shared::{Product, Result, SeoContextError, SourceConfig, SourceId};

use super::SourceConnector;

pub struct FileConnector {
    id: SourceId,
    dir: PathBuf,
}

impl FileConnector {
    pub fn new(id: SourceId, dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            dir: dir.into(),
        }
    }

    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        let dir = source.path.as_deref().ok_or_else(|| {
            SeoContextError::config(format!("file source '{}' needs a path", source.id))
        })?;
        Ok(Self::new(source.id, dir))
    }

    /// Candidate payload files, most specific first.
    fn candidates(&self, product: &Product) -> Vec<PathBuf> {
        let file_name = format!("{}.json", self.id.as_str());
        let key = product.key();
        let mut paths = Vec::with_capacity(2);
        if !key.is_empty() {
            paths.push(self.dir.join(&key).join(&file_name));
        }
        paths.push(self.dir.join(file_name));
        paths
    }
}

#[async_trait]
impl SourceConnector for FileConnector {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, product: &Product) -> Result<serde_json::Value> {
        for path in self.candidates(product) {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    debug!(source = %self.id, path = %path.display(), "reading recorded payload");
                    return parse_json(&path, &content);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(SeoContextError::io(path, e)),
            }
        }
        Err(SeoContextError::empty_result(self.id.as_str()))
    }
}

fn parse_json(path: &Path, content: &str) -> Result<serde_json::Value> {
    serde_json::from_str(content).map_err(|e| {
        SeoContextError::validation(format!("{} is not valid JSON: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        PathBuf::from("../../../fixtures/json/sources")
    }

    fn sage_cooker() -> Product {
        Product {
            ean: Some("9312432031183".into()),
            title: Some("Sage the Fast Slow Pro".into()),
            ..Product::default()
        }
    }

    #[tokio::test]
    async fn reads_per_product_payload() {
        let connector = FileConnector::new(SourceId::Analytics, fixture_dir());
        let raw = connector.fetch(&sage_cooker()).await.expect("payload");
        assert!(raw.get("brand_keywords").is_some());
    }

    #[tokio::test]
    async fn falls_back_to_shared_payload() {
        let connector = FileConnector::new(SourceId::WebCrawl, fixture_dir());
        let product = Product {
            ean: Some("0000000000000".into()),
            ..Product::default()
        };
        let raw = connector.fetch(&product).await.expect("shared payload");
        assert!(raw.get("pages").is_some());
    }

    #[tokio::test]
    async fn missing_payload_is_empty_result() {
        let connector = FileConnector::new(SourceId::Analytics, "/nonexistent/seocontext");
        let err = connector.fetch(&sage_cooker()).await.unwrap_err();
        assert!(matches!(err, SeoContextError::EmptyResult { .. }));
    }

    #[test]
    fn product_key_stays_inside_payload_dir() {
        let connector = FileConnector::new(SourceId::Analytics, "/data/payloads");
        let product = Product {
            ean: Some("../../secrets".into()),
            ..Product::default()
        };
        let paths = connector.candidates(&product);
        assert_eq!(paths[0], PathBuf::from("/data/payloads/secrets/analytics.json"));
        assert_eq!(paths[1], PathBuf::from("/data/payloads/analytics.json"));
    }
}
