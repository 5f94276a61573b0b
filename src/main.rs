//! Selenia monitor - headless serial telemetry monitor
//!
//! Connects to the sensor (and optionally the alert unit), classifies or tracks
//! incoming lines and prints the session events to stdout until Ctrl+C or the
//! sensor link fails.
//!
//! Module structure:
//! - `domain/` - Core types (ParsedRecord, Mode, StatusLine, SessionEvent)
//! - `io/` - External interfaces (serial links, event channel)
//! - `services/` - Line handling (parser, classifier, tracking, alerts, session)
//! - `infra/` - Infrastructure (Config)

use clap::{Parser, ValueEnum};
use selenia_monitor::domain::{LogEntry, Mode, SessionEvent};
use selenia_monitor::infra::Config;
use selenia_monitor::io::{create_event_channel, list_ports, SerialLinks};
use selenia_monitor::services::{ConnectSettings, Session};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// How often the main loop checks that the read loop is still alive
const LIVENESS_CHECK_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Selenia monitor - danger classification and object tracking over serial
#[derive(Parser, Debug)]
#[command(name = "selenia-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to $SELENIA_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Sensor serial port
    #[arg(short = 'p', long)]
    sensor_port: Option<String>,

    /// Sensor baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Alert unit serial port (empty string disables forwarding)
    #[arg(short, long)]
    alert_port: Option<String>,

    /// Alert unit baud rate
    #[arg(long)]
    alert_baud: Option<u32>,

    /// Line handler: classification or tracking
    #[arg(short, long)]
    mode: Option<Mode>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Print session events as JSON lines
    #[arg(long)]
    json: bool,

    /// Diagnostic log format (written to stderr)
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    // Default: INFO, use RUST_LOG=debug (or trace for every poll) for more detail
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(port) = &args.sensor_port {
        config = config.with_sensor_port(port.clone());
    }
    if let Some(baud) = args.baud {
        config = config.with_sensor_baud(baud);
    }
    if let Some(port) = &args.alert_port {
        config = config.with_alert_port(Some(port.clone()));
    }
    if let Some(baud) = args.alert_baud {
        config = config.with_alert_baud(baud);
    }
    if let Some(mode) = args.mode {
        config = config.with_mode(mode);
    }
    config
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "event_serialize_failed"),
        }
        return;
    }

    match event {
        SessionEvent::Log(entry) => println!("{}", entry),
        SessionEvent::Status(status) => println!("{}", LogEntry::now(format!("Status: {}", status))),
        // Raw lines are only shown in JSON output
        SessionEvent::LastLine { .. } => {}
        SessionEvent::ReadLoopStopped => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!(git_hash = env!("GIT_HASH"), "selenia-monitor starting");

    if args.list_ports {
        let ports = list_ports();
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let config = Config::load(args.config.as_deref());
    let config = apply_overrides(config, &args);

    info!(
        config_file = %config.config_file(),
        sensor_port = %config.sensor_port(),
        sensor_baud = %config.sensor_baud(),
        alert_port = ?config.alert_port(),
        mode = %config.mode(),
        danger_timeout_ms = %config.danger_timeout_ms(),
        danger_id = %config.danger_id(),
        "config_loaded"
    );

    let (events, mut event_rx) = create_event_channel(config.event_buffer());
    let links = SerialLinks::new(&config);
    let settings = ConnectSettings::from_config(&config);
    let mut session = Session::new(config, links, events);

    let connected = session.connect(&settings).await;
    // Flush whatever connect reported before deciding to exit
    while let Ok(event) = event_rx.try_recv() {
        print_event(&event, args.json);
    }
    if let Err(e) = connected {
        return Err(e.into());
    }

    // ReadLoopStopped can be lost to a full channel; the join handle cannot
    let mut liveness = tokio::time::interval(Duration::from_millis(LIVENESS_CHECK_MS));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown_signal_received");
                break;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                print_event(&event, args.json);
                if event == SessionEvent::ReadLoopStopped {
                    break;
                }
            }
            _ = liveness.tick() => {
                if session.read_loop_finished() {
                    warn!("read_loop_finished_without_notice");
                    break;
                }
            }
        }
    }

    session.disconnect().await;
    while let Ok(event) = event_rx.try_recv() {
        print_event(&event, args.json);
    }

    info!("selenia-monitor shutdown complete");
    Ok(())
}
