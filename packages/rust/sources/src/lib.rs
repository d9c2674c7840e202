//! Data source connectors and payload normalization.
//!
//! This crate provides:
//! - [`connectors`]: the [`SourceConnector`] trait, file/HTTP/static connectors
//!   and the [`ConnectorRegistry`]
//! - [`payload`]: typed per-source reports parsed from raw JSON
//! - [`normalize`]: raw payload to [`SignalRecord`](seocontext_shared::SignalRecord) conversion

pub mod connectors;
pub mod normalize;
pub mod payload;

pub use connectors::{
    ConnectorRegistry, FileConnector, HttpConnector, SourceConnector, StaticConnector,
    fetch_payload,
};
pub use normalize::normalize;
pub use payload::{
    AnalyticsReport, CompetitorDbReport, MerchantReport, SearchConsoleReport, SourcePayload,
    TrendReport, WebCrawlReport,
};
pub use payload::merchant::{PricePosition, relative_position};
