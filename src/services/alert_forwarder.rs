//! Best-effort forwarding of the danger signal to the wearable alert unit
//!
//! Only state changes are transmitted. A write failure disables the link until
//! the next connect; it never stops classification.

use crate::domain::types::{AlertCommand, AlertState, ClassificationStatus};
use crate::io::event_channel::EventSender;
use crate::io::link::AlertSink;
use tracing::{error, info, warn};

pub struct AlertForwarder {
    sink: Option<Box<dyn AlertSink>>,
    /// False once a write failed
    available: bool,
    last_sent: AlertState,
    events: EventSender,
}

impl AlertForwarder {
    pub fn new(sink: Option<Box<dyn AlertSink>>, events: EventSender) -> Self {
        let available = sink.is_some();
        Self { sink, available, last_sent: AlertState::None, events }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn last_sent(&self) -> AlertState {
        self.last_sent
    }

    /// Command to transmit for `status`, or None if the unit already has it
    pub fn pending_command(&self, status: ClassificationStatus) -> Option<AlertCommand> {
        let command = AlertCommand::for_status(status);
        (command.state() != self.last_sent).then_some(command)
    }

    /// Transmit the command for `status` if it differs from the last one sent.
    /// Returns the command actually written.
    pub async fn maybe_send(&mut self, status: ClassificationStatus) -> Option<AlertCommand> {
        if !self.available {
            return None;
        }
        let command = self.pending_command(status)?;
        let sink = self.sink.as_mut()?;

        match sink.write(command.as_bytes()).await {
            Ok(()) => {
                info!(status = %status, command = ?command, "alert_sent");
                self.last_sent = command.state();
                Some(command)
            }
            Err(e) => {
                error!(error = %e, "alert_link_write_failed");
                warn!("alert_link_disabled");
                self.events.log(format!("Alert link error: {}", e));
                self.available = false;
                None
            }
        }
    }

    /// Release the alert link, if any
    pub async fn close(&mut self) {
        let Some(mut sink) = self.sink.take() else {
            return;
        };
        self.available = false;
        if let Err(e) = sink.close().await {
            error!(error = %e, "alert_link_close_failed");
            self.events.log(format!("Error closing alert link: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::event_channel::create_event_channel;
    use crate::io::link::LinkError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
            if self.fail {
                return Err(LinkError::WriteFailed(std::io::Error::other("unplugged")));
            }
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
    }

    fn forwarder(sink: RecordingSink) -> AlertForwarder {
        let (events, _rx) = create_event_channel(16);
        AlertForwarder::new(Some(Box::new(sink)), events)
    }

    #[tokio::test]
    async fn test_repeated_status_sent_once() {
        let sink = RecordingSink::default();
        let mut fwd = forwarder(sink.clone());

        assert_eq!(fwd.maybe_send(ClassificationStatus::Danger).await, Some(AlertCommand::Raise));
        assert_eq!(fwd.maybe_send(ClassificationStatus::Danger).await, None);
        assert_eq!(fwd.last_sent(), AlertState::Danger);
        assert_eq!(*sink.writes.lock().unwrap(), vec![b"1\n".to_vec()]);
    }

    #[tokio::test]
    async fn test_status_changes_are_forwarded() {
        let sink = RecordingSink::default();
        let mut fwd = forwarder(sink.clone());

        for status in [
            ClassificationStatus::Safe,
            ClassificationStatus::Safe,
            ClassificationStatus::Danger,
            ClassificationStatus::Safe,
        ] {
            fwd.maybe_send(status).await;
        }
        assert_eq!(
            *sink.writes.lock().unwrap(),
            vec![b"0\n".to_vec(), b"1\n".to_vec(), b"0\n".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_write_failure_disables_link() {
        let sink = RecordingSink { fail: true, ..Default::default() };
        let mut fwd = forwarder(sink);

        assert_eq!(fwd.maybe_send(ClassificationStatus::Danger).await, None);
        assert!(!fwd.is_available());
        assert_eq!(fwd.last_sent(), AlertState::None);
        assert_eq!(fwd.maybe_send(ClassificationStatus::Safe).await, None);
    }

    #[tokio::test]
    async fn test_no_sink_is_noop() {
        let (events, _rx) = create_event_channel(4);
        let mut fwd = AlertForwarder::new(None, events);
        assert!(!fwd.is_available());
        assert_eq!(fwd.maybe_send(ClassificationStatus::Danger).await, None);
        assert_eq!(fwd.pending_command(ClassificationStatus::Danger), Some(AlertCommand::Raise));
        fwd.close().await;
    }
}
