//! Integration tests for configuration loading

use selenia_monitor::domain::Mode;
use selenia_monitor::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[sensor]
port = "/dev/ttyACM0"
baud = 57600
read_timeout_ms = 50
settle_ms = 0

[alert]
port = "/dev/ttyUSB1"
baud = 9600

[classification]
danger_timeout_ms = 1500
danger_id = 42

[session]
mode = "tracking"
poll_interval_ms = 10
last_line_max_chars = 80
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.sensor_port(), "/dev/ttyACM0");
    assert_eq!(config.sensor_baud(), 57600);
    assert_eq!(config.sensor_read_timeout_ms(), 50);
    assert_eq!(config.sensor_settle_ms(), 0);
    assert_eq!(config.alert_port(), Some("/dev/ttyUSB1"));
    assert_eq!(config.alert_baud(), 9600);
    assert_eq!(config.alert_write_timeout_ms(), 200);
    assert_eq!(config.danger_timeout_ms(), 1500);
    assert_eq!(config.danger_id(), 42);
    assert_eq!(config.mode(), Mode::Tracking);
    assert_eq!(config.poll_interval_ms(), 10);
    assert_eq!(config.stop_timeout_ms(), 800);
    assert_eq!(config.last_line_max_chars(), 80);
    assert_eq!(config.config_file(), temp_file.path().display().to_string());
}

#[test]
fn test_empty_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.sensor_port(), "/dev/ttyUSB0");
    assert_eq!(config.alert_port(), None);
    assert_eq!(config.mode(), Mode::Classification);
}

#[test]
fn test_invalid_file_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[session]\nmode = \"sideways\"\n").unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.sensor_port(), "/dev/ttyUSB0");
    assert_eq!(config.sensor_baud(), 115200);
    assert_eq!(config.danger_timeout_ms(), 800);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_load_uses_config_argument() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[classification]\ndanger_id = 3\n").unwrap();
    temp_file.flush().unwrap();

    let path = temp_file.path().display().to_string();
    let config = Config::load(Some(&path));
    assert_eq!(config.danger_id(), 3);
}
