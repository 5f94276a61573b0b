//! Shared types for the SELENIA monitor

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder rendered for a field the sensor did not report
pub const PLACEHOLDER: &str = "—";

/// Numeric field value. Integral values are normalized to `Int`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Normalize a parsed float: zero fractional part becomes an integer
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Number::Int(value as i64)
        } else {
            Number::Float(value)
        }
    }

    /// Truncate toward zero (used for object id keys)
    pub fn trunc(&self) -> i64 {
        match *self {
            Number::Int(v) => v,
            Number::Float(v) => v.trunc() as i64,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Result of parsing one sensor line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    /// Original (trimmed) line text
    pub raw: String,
    pub object_id: Option<i64>,
    pub x: Option<Number>,
    pub y: Option<Number>,
    pub z: Option<Number>,
    /// Line carries the configured danger id
    pub danger_marker: bool,
}

impl ParsedRecord {
    /// Record with no structured fields; the line is displayed verbatim
    pub fn passthrough(raw: &str, danger_marker: bool) -> Self {
        Self { raw: raw.to_string(), object_id: None, x: None, y: None, z: None, danger_marker }
    }

    #[inline]
    pub fn is_passthrough(&self) -> bool {
        self.x.is_none() || self.y.is_none()
    }
}

/// Which handler processes incoming lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Classification,
    Tracking,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Classification => "classification",
            Mode::Tracking => "tracking",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Classification => Mode::Tracking,
            Mode::Tracking => Mode::Classification,
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classification" => Ok(Mode::Classification),
            "tracking" => Ok(Mode::Tracking),
            other => Err(format!("unknown mode '{}' (expected classification or tracking)", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-valued classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStatus {
    Danger,
    Safe,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Danger => "DANGER",
            ClassificationStatus::Safe => "SAFE",
        }
    }
}

impl fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last value actually written to the alert link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    None,
    Danger,
    Safe,
}

/// One-byte command for the wearable alert unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    Raise,
    Clear,
}

impl AlertCommand {
    pub fn for_status(status: ClassificationStatus) -> Self {
        match status {
            ClassificationStatus::Danger => AlertCommand::Raise,
            ClassificationStatus::Safe => AlertCommand::Clear,
        }
    }

    /// Wire bytes: ASCII digit followed by newline
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            AlertCommand::Raise => b"1\n",
            AlertCommand::Clear => b"0\n",
        }
    }

    pub fn state(&self) -> AlertState {
        match self {
            AlertCommand::Raise => AlertState::Danger,
            AlertCommand::Clear => AlertState::Safe,
        }
    }
}

/// Content of the live status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusLine {
    Disconnected,
    Connected,
    Classification { value: ClassificationStatus },
    Tracking { unique_ids: usize },
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Disconnected => f.write_str("Disconnected"),
            StatusLine::Connected => f.write_str("Connected (sensor)"),
            StatusLine::Classification { value } => f.write_str(value.as_str()),
            StatusLine::Tracking { unique_ids } => {
                write!(f, "Tracking: {} unique id(s) detected", unique_ids)
            }
        }
    }
}

/// Timestamped line for the append-only display log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self { at: Local::now(), message: message.into() }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Item on the session → display stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum SessionEvent {
    Log(LogEntry),
    Status(StatusLine),
    LastLine { line: String },
    /// Read loop exited on its own (transport error)
    ReadLoopStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_normalization() {
        assert_eq!(Number::from_f64(120.0), Number::Int(120));
        assert_eq!(Number::from_f64(-0.0), Number::Int(0));
        assert_eq!(Number::from_f64(12.5), Number::Float(12.5));
        assert_eq!(Number::from_f64(3.0).to_string(), "3");
        assert_eq!(Number::from_f64(-7.25).to_string(), "-7.25");
    }

    #[test]
    fn test_number_trunc_toward_zero() {
        assert_eq!(Number::Float(7.9).trunc(), 7);
        assert_eq!(Number::Float(-2.5).trunc(), -2);
        assert_eq!(Number::Int(4).trunc(), 4);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("classification".parse::<Mode>().unwrap(), Mode::Classification);
        assert_eq!("TRACKING".parse::<Mode>().unwrap(), Mode::Tracking);
        assert!("radar".parse::<Mode>().is_err());
        assert_eq!(Mode::Tracking.toggled(), Mode::Classification);
    }

    #[test]
    fn test_alert_command_bytes() {
        assert_eq!(AlertCommand::for_status(ClassificationStatus::Danger).as_bytes(), b"1\n");
        assert_eq!(AlertCommand::for_status(ClassificationStatus::Safe).as_bytes(), b"0\n");
        assert_eq!(AlertCommand::Raise.state(), AlertState::Danger);
    }

    #[test]
    fn test_status_line_text() {
        assert_eq!(StatusLine::Disconnected.to_string(), "Disconnected");
        assert_eq!(
            StatusLine::Classification { value: ClassificationStatus::Danger }.to_string(),
            "DANGER"
        );
        assert_eq!(
            StatusLine::Tracking { unique_ids: 3 }.to_string(),
            "Tracking: 3 unique id(s) detected"
        );
    }

    #[test]
    fn test_log_entry_format() {
        let entry = LogEntry::now("SAFE");
        let text = entry.to_string();
        assert!(text.starts_with('['));
        assert!(text.ends_with("] SAFE"));
        // [HH:MM:SS] prefix is exactly 10 chars
        assert_eq!(&text[9..10], "]");
    }
}
