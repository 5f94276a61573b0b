//! Configuration: defaults, optional TOML file, command-line overrides
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. SELENIA_CONFIG environment variable
//! 3. None: built-in defaults
//!
//! Every section and key is optional in the file.

use crate::domain::types::Mode;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub port: String,
    pub baud: u32,
    pub read_timeout_ms: u64,
    /// Wait after opening; the sensor bridge board resets on open
    pub settle_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { port: "/dev/ttyUSB0".to_string(), baud: 115200, read_timeout_ms: 100, settle_ms: 500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alert unit port; forwarding is disabled when unset
    pub port: Option<String>,
    pub baud: u32,
    pub write_timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { port: None, baud: 115200, write_timeout_ms: 200, settle_ms: 200 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub danger_timeout_ms: u64,
    /// Object id that marks a dangerous object
    pub danger_id: i64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { danger_timeout_ms: 800, danger_id: 1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: Mode,
    pub poll_interval_ms: u64,
    pub stop_timeout_ms: u64,
    pub last_line_max_chars: usize,
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Classification,
            poll_interval_ms: 20,
            stop_timeout_ms: 800,
            last_line_max_chars: 120,
            event_buffer: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    pub sensor: SensorConfig,
    pub alert: AlertConfig,
    pub classification: ClassificationConfig,
    pub session: SessionConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    sensor_port: String,
    sensor_baud: u32,
    sensor_read_timeout_ms: u64,
    sensor_settle_ms: u64,
    alert_port: Option<String>,
    alert_baud: u32,
    alert_write_timeout_ms: u64,
    alert_settle_ms: u64,
    danger_timeout_ms: u64,
    danger_id: i64,
    mode: Mode,
    poll_interval_ms: u64,
    stop_timeout_ms: u64,
    last_line_max_chars: usize,
    event_buffer: usize,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            sensor_port: toml_config.sensor.port,
            sensor_baud: toml_config.sensor.baud,
            sensor_read_timeout_ms: toml_config.sensor.read_timeout_ms,
            sensor_settle_ms: toml_config.sensor.settle_ms,
            // Empty string in the file means "no alert unit"
            alert_port: toml_config.alert.port.filter(|p| !p.trim().is_empty()),
            alert_baud: toml_config.alert.baud,
            alert_write_timeout_ms: toml_config.alert.write_timeout_ms,
            alert_settle_ms: toml_config.alert.settle_ms,
            danger_timeout_ms: toml_config.classification.danger_timeout_ms,
            danger_id: toml_config.classification.danger_id,
            mode: toml_config.session.mode,
            poll_interval_ms: toml_config.session.poll_interval_ms,
            stop_timeout_ms: toml_config.session.stop_timeout_ms,
            last_line_max_chars: toml_config.session.last_line_max_chars,
            event_buffer: toml_config.session.event_buffer.max(1),
            config_file,
        }
    }

    /// Determine config file path: `--config` value first, then the environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> Option<String> {
        match cli_path.filter(|p| !p.trim().is_empty()) {
            Some(path) => Some(path.to_string()),
            None => env::var("SELENIA_CONFIG").ok().filter(|p| !p.trim().is_empty()),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults on any error
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration: file if one is named, defaults otherwise
    pub fn load(cli_path: Option<&str>) -> Self {
        match Self::resolve_config_path(cli_path) {
            Some(path) => Self::load_from_path(path),
            None => Self::default(),
        }
    }

    // Overrides applied from the command line / UI selections

    pub fn with_sensor_port(mut self, port: impl Into<String>) -> Self {
        self.sensor_port = port.into();
        self
    }

    pub fn with_sensor_baud(mut self, baud: u32) -> Self {
        self.sensor_baud = baud;
        self
    }

    pub fn with_alert_port(mut self, port: Option<String>) -> Self {
        self.alert_port = port.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_alert_baud(mut self, baud: u32) -> Self {
        self.alert_baud = baud;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_danger_timeout_ms(mut self, ms: u64) -> Self {
        self.danger_timeout_ms = ms;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_stop_timeout_ms(mut self, ms: u64) -> Self {
        self.stop_timeout_ms = ms;
        self
    }

    pub fn with_last_line_max_chars(mut self, chars: usize) -> Self {
        self.last_line_max_chars = chars;
        self
    }

    // Getters for all config fields
    pub fn sensor_port(&self) -> &str {
        &self.sensor_port
    }

    pub fn sensor_baud(&self) -> u32 {
        self.sensor_baud
    }

    pub fn sensor_read_timeout_ms(&self) -> u64 {
        self.sensor_read_timeout_ms
    }

    pub fn sensor_settle_ms(&self) -> u64 {
        self.sensor_settle_ms
    }

    pub fn alert_port(&self) -> Option<&str> {
        self.alert_port.as_deref()
    }

    pub fn alert_baud(&self) -> u32 {
        self.alert_baud
    }

    pub fn alert_write_timeout_ms(&self) -> u64 {
        self.alert_write_timeout_ms
    }

    pub fn alert_settle_ms(&self) -> u64 {
        self.alert_settle_ms
    }

    pub fn danger_timeout_ms(&self) -> u64 {
        self.danger_timeout_ms
    }

    pub fn danger_id(&self) -> i64 {
        self.danger_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn stop_timeout_ms(&self) -> u64 {
        self.stop_timeout_ms
    }

    pub fn last_line_max_chars(&self) -> usize {
        self.last_line_max_chars
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
