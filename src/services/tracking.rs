//! Tracking aggregator: display records and unique id count

use crate::domain::types::{Number, ParsedRecord, PLACEHOLDER};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Result of feeding one record to the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUpdate {
    /// Line for the display log
    pub line: String,
    /// Distinct ids seen since connect
    pub unique_ids: usize,
    /// Line had no coordinates and is echoed as-is
    pub passthrough: bool,
}

#[derive(Debug, Default)]
pub struct TrackingAggregator {
    seen_ids: FxHashSet<i64>,
}

impl TrackingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique_ids(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn on_record(&mut self, record: &ParsedRecord) -> TrackingUpdate {
        if record.is_passthrough() {
            return TrackingUpdate {
                line: record.raw.clone(),
                unique_ids: self.seen_ids.len(),
                passthrough: true,
            };
        }

        if let Some(id) = record.object_id {
            if self.seen_ids.insert(id) {
                debug!(object_id = id, unique_ids = self.seen_ids.len(), "tracking_new_id");
            }
        }

        TrackingUpdate {
            line: format_record(record),
            unique_ids: self.seen_ids.len(),
            passthrough: false,
        }
    }
}

/// `ID:7  X:120px  Y:80px  Z:30px`, with a placeholder for missing id/z
pub fn format_record(record: &ParsedRecord) -> String {
    let id = record.object_id.map(|id| id.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string());
    let px = |v: Option<Number>| {
        v.map(|n| format!("{}px", n)).unwrap_or_else(|| PLACEHOLDER.to_string())
    };
    format!("ID:{}  X:{}  Y:{}  Z:{}", id, px(record.x), px(record.y), px(record.z))
}
