//! Link abstractions for the sensor (inbound) and alert (outbound) devices
//!
//! The session only sees these traits; `serial` provides the tokio-serial
//! implementation and tests drive the session with in-memory links.

use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// Transport failure on one of the links
#[derive(Debug, Error)]
pub enum LinkError {
    /// Port could not be opened
    #[error("could not open {port}: {reason}")]
    OpenFailed { port: String, reason: String },
    /// Reading from the sensor link failed (terminates the read loop)
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),
    /// Writing to the alert link failed or timed out
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
    /// Releasing the handle failed
    #[error("close failed: {0}")]
    CloseFailed(#[source] io::Error),
}

impl LinkError {
    /// Error for an operation on a handle that was already closed
    pub fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "link closed")
    }
}

/// Inbound line source
#[async_trait]
pub trait LineSource: Send {
    /// Read one line, waiting at most the source's read timeout.
    /// `Ok(None)` means the timeout elapsed with no complete line.
    async fn read_line(&mut self) -> Result<Option<String>, LinkError>;

    /// Release the handle. Later reads fail.
    async fn close(&mut self) -> Result<(), LinkError>;
}

/// Outbound byte sink
#[async_trait]
pub trait AlertSink: Send {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    async fn close(&mut self) -> Result<(), LinkError>;
}

/// Opens links at connect time
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open_sensor(&self, port: &str, baud: u32) -> Result<Box<dyn LineSource>, LinkError>;

    async fn open_alert(&self, port: &str, baud: u32) -> Result<Box<dyn AlertSink>, LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::OpenFailed { port: "/dev/ttyUSB9".into(), reason: "No such file".into() };
        assert_eq!(err.to_string(), "could not open /dev/ttyUSB9: No such file");
        assert!(err.source().is_none());

        let err = LinkError::ReadFailed(LinkError::closed());
        assert_eq!(err.to_string(), "read failed: link closed");
        assert!(err.source().is_some());

        let err = LinkError::WriteFailed(io::Error::new(io::ErrorKind::TimedOut, "alert write timed out"));
        assert_eq!(err.to_string(), "write failed: alert write timed out");
        assert_eq!(
            err.source().and_then(|e| e.downcast_ref::<io::Error>()).map(|e| e.kind()),
            Some(io::ErrorKind::TimedOut)
        );
    }
}
