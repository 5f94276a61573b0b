//! Session controller: connect/disconnect lifecycle and the sensor read loop
//!
//! While connected, all per-connection state (links, classifier, tracking ids,
//! alert state) is owned by the read-loop task. The controller talks to it only
//! through the stop flag and the mode channel, and gets the state back when the
//! loop is joined so the links can be closed.

mod read_loop;

use crate::domain::types::{Mode, StatusLine};
use crate::infra::config::Config;
use crate::io::event_channel::EventSender;
use crate::io::link::{LinkError, LinkOpener};
use crate::services::alert_forwarder::AlertForwarder;
use read_loop::ReadLoop;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use read_loop::truncate_for_display;

/// Port selection applied at connect time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectSettings {
    pub sensor_port: String,
    pub sensor_baud: u32,
    /// None disables alert forwarding
    pub alert_port: Option<String>,
    pub alert_baud: u32,
}

impl ConnectSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sensor_port: config.sensor_port().to_string(),
            sensor_baud: config.sensor_baud(),
            alert_port: config.alert_port().map(str::to_string),
            alert_baud: config.alert_baud(),
        }
    }
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<ReadLoop>,
    sensor_port: String,
}

pub struct Session<L: LinkOpener> {
    config: Config,
    links: L,
    events: EventSender,
    mode_tx: watch::Sender<Mode>,
    running: Option<Running>,
}

impl<L: LinkOpener> Session<L> {
    pub fn new(config: Config, links: L, events: EventSender) -> Self {
        let (mode_tx, _) = watch::channel(config.mode());
        Self { config, links, events, mode_tx, running: None }
    }

    pub fn is_connected(&self) -> bool {
        self.running.is_some()
    }

    /// Read loop exited on its own (sensor error) while still connected
    pub fn read_loop_finished(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.handle.is_finished())
    }

    pub fn mode(&self) -> Mode {
        *self.mode_tx.borrow()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select the line handler; a running loop picks it up on its next line
    pub fn set_mode(&mut self, mode: Mode) {
        let previous = self.mode_tx.send_replace(mode);
        if previous != mode {
            info!(mode = %mode, "session_mode_changed");
            self.events.log(format!("Mode: {}", mode));
        }
    }

    /// Open the sensor link (required) and alert link (optional), then start reading
    pub async fn connect(&mut self, settings: &ConnectSettings) -> Result<(), LinkError> {
        if let Some(running) = &self.running {
            warn!(device = %running.sensor_port, "session_already_connected");
            return Ok(());
        }

        if settings.sensor_port.trim().is_empty() {
            self.events.log("No port selected.");
            return Err(LinkError::OpenFailed {
                port: String::new(),
                reason: "no port selected".to_string(),
            });
        }

        let source = match self.links.open_sensor(&settings.sensor_port, settings.sensor_baud).await
        {
            Ok(source) => source,
            Err(e) => {
                error!(device = %settings.sensor_port, error = %e, "sensor_link_open_failed");
                self.events.log(format!("Error connecting sensor: {}", e));
                return Err(e);
            }
        };
        info!(device = %settings.sensor_port, baud = %settings.sensor_baud, "sensor_link_opened");
        self.events.log(format!(
            "Sensor connected on {} @ {}",
            settings.sensor_port, settings.sensor_baud
        ));
        self.events.status(StatusLine::Connected);

        let sink = match &settings.alert_port {
            None => {
                info!("alert_link_not_configured");
                None
            }
            Some(port) => match self.links.open_alert(port, settings.alert_baud).await {
                Ok(sink) => {
                    info!(device = %port, "alert_link_opened");
                    self.events.log(format!("Alert unit connected on {}", port));
                    Some(sink)
                }
                Err(e) => {
                    warn!(device = %port, error = %e, "alert_link_open_failed");
                    self.events.log(format!("Alert link unavailable: {}", e));
                    None
                }
            },
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let forwarder = AlertForwarder::new(sink, self.events.clone());
        let read_loop = ReadLoop::new(
            &self.config,
            source,
            forwarder,
            self.mode_tx.subscribe(),
            stop_rx,
            self.events.clone(),
        );
        let handle = tokio::spawn(read_loop.run());

        self.running =
            Some(Running { stop_tx, handle, sensor_port: settings.sensor_port.clone() });
        Ok(())
    }

    /// Stop the read loop (bounded wait), close both links, reset per-connection state
    pub async fn disconnect(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let Running { stop_tx, mut handle, sensor_port } = running;
        let _ = stop_tx.send(true);

        let stop_timeout = Duration::from_millis(self.config.stop_timeout_ms());
        match tokio::time::timeout(stop_timeout, &mut handle).await {
            Ok(Ok(mut read_loop)) => read_loop.close_links().await,
            Ok(Err(e)) => {
                // Task panicked; its links were dropped with it
                error!(error = %e, "read_loop_join_failed");
            }
            Err(_) => {
                warn!(timeout_ms = %stop_timeout.as_millis(), "read_loop_stop_timeout");
                // Aborting drops the task state, which releases both ports
                handle.abort();
                let _ = handle.await;
            }
        }

        info!(device = %sensor_port, dropped_events = self.events.dropped(), "session_disconnected");
        self.events.status(StatusLine::Disconnected);
        self.events.log("Disconnected.");
    }
}
