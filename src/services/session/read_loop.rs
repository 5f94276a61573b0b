//! Sensor read loop and per-line handlers

use crate::domain::types::{ClassificationStatus, Mode, SessionEvent, StatusLine};
use crate::infra::config::Config;
use crate::io::event_channel::EventSender;
use crate::io::link::LineSource;
use crate::services::alert_forwarder::AlertForwarder;
use crate::services::classifier::{Classifier, Evaluation};
use crate::services::line_parser::LineParser;
use crate::services::tracking::TrackingAggregator;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, trace};

/// Cut a line to `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_for_display(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &line[..idx]),
        None => line.to_string(),
    }
}

pub(super) struct ReadLoop {
    source: Box<dyn LineSource>,
    forwarder: AlertForwarder,
    parser: LineParser,
    classifier: Classifier,
    tracking: TrackingAggregator,
    mode: Mode,
    mode_rx: watch::Receiver<Mode>,
    stop_rx: watch::Receiver<bool>,
    events: EventSender,
    poll_interval: Duration,
    last_line_max_chars: usize,
    /// Last classification status never reached the display
    status_pending: bool,
}

impl ReadLoop {
    pub(super) fn new(
        config: &Config,
        source: Box<dyn LineSource>,
        forwarder: AlertForwarder,
        mut mode_rx: watch::Receiver<Mode>,
        stop_rx: watch::Receiver<bool>,
        events: EventSender,
    ) -> Self {
        let mode = *mode_rx.borrow_and_update();
        Self {
            source,
            forwarder,
            parser: LineParser::new(config.danger_id()),
            classifier: Classifier::new(Duration::from_millis(config.danger_timeout_ms())),
            tracking: TrackingAggregator::new(),
            mode,
            mode_rx,
            stop_rx,
            events,
            poll_interval: Duration::from_millis(config.poll_interval_ms()),
            last_line_max_chars: config.last_line_max_chars(),
            status_pending: false,
        }
    }

    /// Run until stopped or the sensor link fails; hands the state back for cleanup
    pub(super) async fn run(mut self) -> Self {
        info!(
            mode = %self.mode,
            danger_id = self.parser.danger_id(),
            danger_timeout_ms = self.classifier.danger_timeout().as_millis() as u64,
            "read_loop_started"
        );

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            let read = tokio::select! {
                biased;
                _ = self.stop_rx.changed() => break,
                read = self.source.read_line() => read,
            };

            self.sync_mode().await;

            match read {
                Ok(Some(line)) if !line.is_empty() => self.handle_line(&line).await,
                Ok(_) => self.handle_idle().await,
                Err(e) => {
                    error!(error = %e, "sensor_read_failed");
                    self.events.log(format!("Sensor error: {}", e));
                    self.events.send(SessionEvent::ReadLoopStopped);
                    break;
                }
            }

            tokio::select! {
                biased;
                _ = self.stop_rx.changed() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("read_loop_stopped");
        self
    }

    /// Pick up a mode change sent by the controller
    async fn sync_mode(&mut self) {
        let mode = *self.mode_rx.borrow_and_update();
        if mode == self.mode {
            return;
        }
        let previous = self.mode;
        self.mode = mode;
        info!(from = %previous, to = %mode, "read_loop_mode_switched");

        match mode {
            Mode::Classification => self.classifier.forget_emitted(),
            Mode::Tracking => {
                self.status_pending = false;
                // Leaving classification: do not leave the alert unit raised
                self.forwarder.maybe_send(ClassificationStatus::Safe).await;
                self.events.status(StatusLine::Tracking { unique_ids: self.tracking.unique_ids() });
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let now = Instant::now();
        trace!(line = %line, "sensor_line");
        self.events.last_line(truncate_for_display(line, self.last_line_max_chars));

        let record = self.parser.parse(line);
        match self.mode {
            Mode::Classification => {
                let eval = self.classifier.on_record(&record, now);
                self.publish_classification(eval).await;
            }
            Mode::Tracking => {
                let update = self.tracking.on_record(&record);
                self.events.log(update.line);
                if !update.passthrough {
                    self.events.status(StatusLine::Tracking { unique_ids: update.unique_ids });
                }
            }
        }
    }

    async fn handle_idle(&mut self) {
        if self.mode == Mode::Classification {
            let eval = self.classifier.on_tick(Instant::now());
            self.publish_classification(eval).await;
        }
    }

    async fn publish_classification(&mut self, eval: Evaluation) {
        // Forward on every evaluation; the forwarder drops repeats
        self.forwarder.maybe_send(eval.status).await;
        // Resend on later ticks until the display has it
        if eval.changed || self.status_pending {
            let delivered = self.events.status(StatusLine::Classification { value: eval.status });
            self.status_pending = !delivered;
        }
        if eval.changed {
            self.events.log(eval.status.as_str());
        }
    }

    /// Close both links; a failure on one does not skip the other
    pub(super) async fn close_links(&mut self) {
        if let Err(e) = self.source.close().await {
            error!(error = %e, "sensor_link_close_failed");
            self.events.log(format!("Error closing sensor link: {}", e));
        }
        self.forwarder.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_line_untouched() {
        assert_eq!(truncate_for_display("ID:1", 120), "ID:1");
        assert_eq!(truncate_for_display("abc", 3), "abc");
    }

    #[test]
    fn test_truncate_long_line() {
        let line = "x".repeat(130);
        let shown = truncate_for_display(&line, 120);
        assert_eq!(shown.chars().count(), 121);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_for_display("ñañaña", 2), "ña…");
    }
}
