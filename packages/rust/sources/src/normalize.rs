//! Source record normalization: raw payload in, signal records out.

use serde_json::Value;
use tracing::debug;

use seocontext_shared::{SignalRecord, SourceId};

use crate::payload::SourcePayload;

/// Convert one source's raw response into signal records.
///
/// Never fails: an error envelope, an empty payload, or a payload with no
/// keyword data all yield an empty list.
pub fn normalize(source: SourceId, raw: &Value) -> Vec<SignalRecord> {
    match SourcePayload::parse(source, raw) {
        Ok(payload) => payload.signal_records(),
        Err(e) => {
            debug!(source = %source, error = %e, "no signal records from source");
            Vec::new()
        }
    }
}
