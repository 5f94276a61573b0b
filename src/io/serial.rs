//! Serial links over tokio-serial
//!
//! Sensor: newline-delimited text, read with a bounded timeout. Partial lines
//! are kept in a persistent buffer across reads, since the sensor bridge often
//! delivers a line in several chunks.
//! Alert: one short command per state change, bounded write.

use crate::infra::config::Config;
use crate::io::link::{AlertSink, LineSource, LinkError, LinkOpener};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Baud rates offered by the UI
pub const BAUD_CHOICES: [u32; 3] = [9600, 57600, 115200];

/// Names of serial ports present on this machine
pub fn list_ports() -> Vec<String> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!(error = %e, "serial_port_enumeration_failed");
            Vec::new()
        }
    }
}

/// Decode raw line bytes: invalid UTF-8 is replaced, surrounding whitespace trimmed
pub fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn open_stream(port: &str, baud: u32, timeout: Duration) -> Result<SerialStream, LinkError> {
    tokio_serial::new(port, baud)
        .timeout(timeout)
        .open_native_async()
        .map_err(|e| LinkError::OpenFailed { port: port.to_string(), reason: e.to_string() })
}

pub struct SerialLineSource {
    port_name: String,
    reader: Option<BufReader<SerialStream>>,
    read_timeout: Duration,
    /// Bytes of the line currently being received
    pending: Vec<u8>,
}

impl SerialLineSource {
    pub fn open(port: &str, baud: u32, read_timeout: Duration) -> Result<Self, LinkError> {
        let stream = open_stream(port, baud, read_timeout)?;
        Ok(Self {
            port_name: port.to_string(),
            reader: Some(BufReader::new(stream)),
            read_timeout,
            pending: Vec::with_capacity(256),
        })
    }
}

#[async_trait]
impl LineSource for SerialLineSource {
    async fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(LinkError::ReadFailed(LinkError::closed()));
        };

        // read_until appends partial data to `pending` even when the timeout fires
        match tokio::time::timeout(self.read_timeout, reader.read_until(b'\n', &mut self.pending))
            .await
        {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(LinkError::ReadFailed(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "sensor link closed by device",
            ))),
            Ok(Ok(_)) => {
                let line = decode_line(&self.pending);
                self.pending.clear();
                Ok(Some(line))
            }
            Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Ok(Err(e)) => Err(LinkError::ReadFailed(e)),
        }
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "sensor_partial_line_discarded");
            self.pending.clear();
        }
        let mut stream = reader.into_inner();
        let result = stream.shutdown().await.map_err(LinkError::CloseFailed);
        info!(device = %self.port_name, "sensor_link_closed");
        result
    }
}

pub struct SerialAlertSink {
    port_name: String,
    stream: Option<SerialStream>,
    write_timeout: Duration,
}

impl SerialAlertSink {
    pub fn open(port: &str, baud: u32, write_timeout: Duration) -> Result<Self, LinkError> {
        let stream = open_stream(port, baud, write_timeout)?;
        Ok(Self { port_name: port.to_string(), stream: Some(stream), write_timeout })
    }
}

#[async_trait]
impl AlertSink for SerialAlertSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::WriteFailed(LinkError::closed()));
        };

        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(result) => result.map_err(LinkError::WriteFailed),
            Err(_) => Err(LinkError::WriteFailed(std::io::Error::new(
                ErrorKind::TimedOut,
                "alert write timed out",
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let result = stream.shutdown().await.map_err(LinkError::CloseFailed);
        info!(device = %self.port_name, "alert_link_closed");
        result
    }
}

/// Opens real serial ports, with settle delays for boards that reset on open
pub struct SerialLinks {
    read_timeout: Duration,
    write_timeout: Duration,
    sensor_settle: Duration,
    alert_settle: Duration,
}

impl SerialLinks {
    pub fn new(config: &Config) -> Self {
        Self {
            read_timeout: Duration::from_millis(config.sensor_read_timeout_ms()),
            write_timeout: Duration::from_millis(config.alert_write_timeout_ms()),
            sensor_settle: Duration::from_millis(config.sensor_settle_ms()),
            alert_settle: Duration::from_millis(config.alert_settle_ms()),
        }
    }
}

#[async_trait]
impl LinkOpener for SerialLinks {
    async fn open_sensor(&self, port: &str, baud: u32) -> Result<Box<dyn LineSource>, LinkError> {
        let source = SerialLineSource::open(port, baud, self.read_timeout)?;
        info!(device = %port, baud = %baud, "sensor_port_opened");
        tokio::time::sleep(self.sensor_settle).await;
        Ok(Box::new(source))
    }

    async fn open_alert(&self, port: &str, baud: u32) -> Result<Box<dyn AlertSink>, LinkError> {
        let sink = SerialAlertSink::open(port, baud, self.write_timeout)?;
        info!(device = %port, baud = %baud, "alert_port_opened");
        tokio::time::sleep(self.alert_settle).await;
        Ok(Box::new(sink))
    }
}
