//! Services - line handling and session lifecycle
//!
//! - `line_parser` - Tolerant extraction of ID/X/Y/Z and the danger marker
//! - `classifier` - Danger window and status change detection
//! - `tracking` - Per-record display lines and unique id count
//! - `alert_forwarder` - Deduplicated alert commands to the alert unit
//! - `session` - Connect/disconnect lifecycle and the sensor read loop

pub mod alert_forwarder;
pub mod classifier;
pub mod line_parser;
pub mod session;
pub mod tracking;

// Re-export commonly used types
pub use alert_forwarder::AlertForwarder;
pub use classifier::{Classifier, Evaluation};
pub use line_parser::LineParser;
pub use session::{ConnectSettings, Session};
pub use tracking::{TrackingAggregator, TrackingUpdate};
