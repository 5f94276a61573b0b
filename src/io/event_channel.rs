//! Typed channel from the session to the display
//!
//! Bounded so a stalled display cannot grow memory without limit. Sends never
//! block the read loop: when the channel is full the event is dropped and counted.

use crate::domain::types::{LogEntry, SessionEvent, StatusLine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Sender handle for display events
///
/// Clone this to share across producers.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<SessionEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx, dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// Queue an event; returns false if it was dropped
    pub fn send(&self, event: SessionEvent) -> bool {
        if self.tx.try_send(event).is_ok() {
            return true;
        }
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        // Warn at 1, 2, 4, 8, ... drops
        if dropped.is_power_of_two() {
            warn!(dropped = dropped, "display_event_dropped");
        }
        false
    }

    /// Append a timestamped line to the display log
    pub fn log(&self, message: impl Into<String>) {
        self.send(SessionEvent::Log(LogEntry::now(message)));
    }

    pub fn status(&self, status: StatusLine) -> bool {
        self.send(SessionEvent::Status(status))
    }

    pub fn last_line(&self, line: String) {
        self.send(SessionEvent::LastLine { line });
    }

    /// Number of events lost to a full channel
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a display channel pair
pub fn create_event_channel(buffer_size: usize) -> (EventSender, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EventSender::new(tx), rx)
}
