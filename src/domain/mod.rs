//! Domain models - records, modes, statuses and session events
//!
//! This module contains the canonical data types used throughout the system:
//! - `ParsedRecord` - one sensor line after tolerant field extraction
//! - `Mode` - which handler consumes incoming lines
//! - `StatusLine` - the single status shown to the operator
//! - `SessionEvent` - everything the session reports to its front end

pub mod types;

// Re-export commonly used types at module level
pub use types::{
    AlertCommand, AlertState, ClassificationStatus, LogEntry, Mode, Number, ParsedRecord,
    SessionEvent, StatusLine, PLACEHOLDER,
};
