//! In-memory connector serving a fixed payload.

use std::time::Duration;

use async_trait::async_trait;

use seocontext_shared::{Product, Result, SourceId};

use super::SourceConnector;

/// Returns the same payload for every product. Useful for embedding recorded
/// data and for exercising the pipeline without I/O.
pub struct StaticConnector {
    id: SourceId,
    payload: serde_json::Value,
    delay: Option<Duration>,
}

impl StaticConnector {
    pub fn new(id: SourceId, payload: serde_json::Value) -> Self {
        Self {
            id,
            payload,
            delay: None,
        }
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SourceConnector for StaticConnector {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _product: &Product) -> Result<serde_json::Value> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.payload.clone())
    }
}
