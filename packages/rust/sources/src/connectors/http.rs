//! Connector querying a JSON endpoint per product.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use seocontext_shared::{
    Product, Result, SeoContextError, SourceConfig, SourceId, resolve_api_key,
};

use super::SourceConnector;

/// User-Agent string for source requests.
const USER_AGENT: &str = concat!("seocontext/", env!("CARGO_PKG_VERSION"));

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// `GET <endpoint>?ean=..&brand=..&title=..`, bearer-authenticated when the
/// source declares an API key variable.
pub struct HttpConnector {
    source: SourceConfig,
    endpoint: Url,
    client: Client,
}

impl HttpConnector {
    pub fn from_config(source: &SourceConfig, timeout: Duration) -> Result<Self> {
        let raw_url = source.url.as_deref().ok_or_else(|| {
            SeoContextError::config(format!("http source '{}' needs a url", source.id))
        })?;
        let endpoint = Url::parse(raw_url).map_err(|e| {
            SeoContextError::config(format!("invalid url for source '{}': {e}", source.id))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SeoContextError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            source: source.clone(),
            endpoint,
            client,
        })
    }

    fn request_url(&self, product: &Product) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in [
                ("ean", product.identifier()),
                ("brand", product.brand.as_deref()),
                ("title", product.title.as_deref()),
            ] {
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    query.append_pair(name, value);
                }
            }
        }
        url
    }
}

#[async_trait]
impl SourceConnector for HttpConnector {
    fn id(&self) -> SourceId {
        self.source.id
    }

    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(source = %self.source.id))]
    async fn fetch(&self, product: &Product) -> Result<serde_json::Value> {
        let id = self.source.id.as_str();
        // Resolved per request so a missing key only takes out this source.
        let api_key = resolve_api_key(&self.source)?;
        let url = self.request_url(product);

        let mut request = self.client.get(url.clone());
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SeoContextError::source_unavailable(id, format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeoContextError::source_unavailable(
                id,
                format!("{url}: HTTP {status}"),
            ));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(SeoContextError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response.json::<serde_json::Value>().await.map_err(|e| {
            SeoContextError::validation(format!("{url}: response is not JSON: {e}"))
        })?;

        debug!(%url, "source responded");
        Ok(body)
    }
}
