//! Source connector trait and built-in connectors.
//!
//! A connector fetches one source's raw payload for a product. Connectors are
//! black boxes to the pipeline: they return a JSON object (possibly `{}` or an
//! `{"error": ...}` envelope) and never panic past their own boundary.

mod file;
mod fixed;
mod http;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use seocontext_shared::{
    AppConfig, ConnectorKind, Product, Result, SeoContextError, SourceId, validate_sources,
};

use crate::payload::SourcePayload;

pub use file::FileConnector;
pub use fixed::StaticConnector;
pub use http::HttpConnector;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Fetches raw payloads from one data source.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Which source this connector serves. Also its run result store key.
    fn id(&self) -> SourceId;

    /// Human-readable connector name for tracing.
    fn name(&self) -> &str;

    /// Fetch the raw payload for `product`.
    async fn fetch(&self, product: &Product) -> Result<serde_json::Value>;
}

/// Fetch and parse one source, bounded by `timeout`.
pub async fn fetch_payload(
    connector: &dyn SourceConnector,
    product: &Product,
    timeout: Duration,
) -> Result<SourcePayload> {
    let id = connector.id();
    let raw = tokio::time::timeout(timeout, connector.fetch(product))
        .await
        .map_err(|_| {
            SeoContextError::source_unavailable(
                id.as_str(),
                format!("no response within {}s", timeout.as_secs()),
            )
        })??;

    debug!(source = %id, connector = connector.name(), "payload received");
    SourcePayload::parse(id, &raw)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds configured connectors in collection order, at most one per source.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn SourceConnector>>,
    timeout: Duration,
}

impl ConnectorRegistry {
    /// Default per-source timeout when none is configured.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Build connectors for every enabled source in the config.
    ///
    /// Fails with `FatalConfiguration` when no source is enabled.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        validate_sources(config)?;

        let timeout = Duration::from_secs(config.defaults.source_timeout_secs);
        let mut registry = Self::new().with_timeout(timeout);

        for source in config.enabled_sources() {
            let connector: Box<dyn SourceConnector> = match source.kind {
                ConnectorKind::File => Box::new(FileConnector::from_config(source)?),
                ConnectorKind::Http => Box::new(HttpConnector::from_config(source, timeout)?),
            };
            registry.register(connector)?;
        }

        Ok(registry)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a connector. A second connector for the same source is rejected.
    pub fn register(&mut self, connector: Box<dyn SourceConnector>) -> Result<()> {
        if self.connectors.iter().any(|c| c.id() == connector.id()) {
            return Err(SeoContextError::config(format!(
                "a connector for '{}' is already registered",
                connector.id()
            )));
        }
        self.connectors.push(connector);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SourceConnector> {
        self.connectors.iter().map(|c| c.as_ref())
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.connectors.iter().map(|c| c.id()).collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_rejects_duplicate_sources() {
        let mut registry = ConnectorRegistry::new();
        registry
            .register(Box::new(StaticConnector::new(SourceId::Analytics, json!({}))))
            .expect("first registration");
        let err = registry
            .register(Box::new(StaticConnector::new(SourceId::Analytics, json!({}))))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_from_config_keeps_declaration_order() {
        let mut config = AppConfig::with_file_sources("/tmp/payloads");
        config.sources[1].enabled = false;
        let registry = ConnectorRegistry::from_config(&config).expect("registry");

        assert_eq!(
            registry.ids(),
            vec![
                SourceId::Analytics,
                SourceId::MerchantCenter,
                SourceId::CompetitorDb,
                SourceId::TrendService,
                SourceId::WebCrawl,
            ]
        );
        assert_eq!(registry.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn registry_from_empty_config_is_fatal() {
        let err = ConnectorRegistry::from_config(&AppConfig::default()).err().expect("error");
        assert!(matches!(err, SeoContextError::FatalConfiguration { .. }));
    }

    #[tokio::test]
    async fn fetch_payload_maps_error_envelope() {
        let connector = StaticConnector::new(SourceId::TrendService, json!({"error": "quota"}));
        let err = fetch_payload(&connector, &Product::default(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SeoContextError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn fetch_payload_times_out() {
        let connector = StaticConnector::new(SourceId::Analytics, json!({"rows": []}))
            .with_delay(Duration::from_millis(200));
        let err = fetch_payload(&connector, &Product::default(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no response"));
    }
}
