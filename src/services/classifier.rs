//! Danger/safe classification with a rolling danger window
//!
//! A danger marker opens (or extends) the window. Status is derived from the
//! time since the last marker on every evaluation, never cached.

use crate::domain::types::{ClassificationStatus, ParsedRecord};
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: ClassificationStatus,
    /// Differs from the previously emitted status (always true for the first evaluation)
    pub changed: bool,
}

pub struct Classifier {
    danger_timeout: Duration,
    last_danger: Option<Instant>,
    last_emitted: Option<ClassificationStatus>,
}

impl Classifier {
    pub fn new(danger_timeout: Duration) -> Self {
        Self { danger_timeout, last_danger: None, last_emitted: None }
    }

    pub fn danger_timeout(&self) -> Duration {
        self.danger_timeout
    }

    /// Status at `now`, without touching emission state
    pub fn status_at(&self, now: Instant) -> ClassificationStatus {
        match self.last_danger {
            Some(t) if now.saturating_duration_since(t) < self.danger_timeout => {
                ClassificationStatus::Danger
            }
            _ => ClassificationStatus::Safe,
        }
    }

    /// Make the next evaluation count as a change (status line was replaced by another mode)
    pub fn forget_emitted(&mut self) {
        self.last_emitted = None;
    }

    /// Feed a parsed line
    pub fn on_record(&mut self, record: &ParsedRecord, now: Instant) -> Evaluation {
        if record.danger_marker {
            self.last_danger = Some(now);
        }
        self.evaluate(now)
    }

    /// Idle tick: no line arrived, let the window expire
    pub fn on_tick(&mut self, now: Instant) -> Evaluation {
        self.evaluate(now)
    }

    fn evaluate(&mut self, now: Instant) -> Evaluation {
        let status = self.status_at(now);
        let changed = self.last_emitted != Some(status);

        if changed {
            info!(
                status = %status,
                previous = ?self.last_emitted,
                "classification_status_changed"
            );
            self.last_emitted = Some(status);
        } else {
            trace!(status = %status, "classification_status");
        }

        Evaluation { status, changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ParsedRecord;

    const TIMEOUT: Duration = Duration::from_millis(800);

    fn danger() -> ParsedRecord {
        ParsedRecord::passthrough("ID:1 detected", true)
    }

    fn plain() -> ParsedRecord {
        ParsedRecord::passthrough("ID:2", false)
    }

    #[test]
    fn test_initial_status_is_safe_and_emitted_once() {
        let mut classifier = Classifier::new(TIMEOUT);
        let t0 = Instant::now();

        let first = classifier.on_tick(t0);
        assert_eq!(first.status, ClassificationStatus::Safe);
        assert!(first.changed);

        let second = classifier.on_tick(t0 + Duration::from_millis(20));
        assert_eq!(second.status, ClassificationStatus::Safe);
        assert!(!second.changed);
    }

    #[test]
    fn test_hysteresis_window() {
        let mut classifier = Classifier::new(TIMEOUT);
        let t0 = Instant::now();
        classifier.on_tick(t0);

        let eval = classifier.on_record(&danger(), t0);
        assert_eq!(eval.status, ClassificationStatus::Danger);
        assert!(eval.changed);

        for ms in [1, 100, 400, 799] {
            let eval = classifier.on_tick(t0 + Duration::from_millis(ms));
            assert_eq!(eval.status, ClassificationStatus::Danger, "at {ms}ms");
            assert!(!eval.changed);
        }

        let eval = classifier.on_tick(t0 + TIMEOUT + Duration::from_millis(1));
        assert_eq!(eval.status, ClassificationStatus::Safe);
        assert!(eval.changed);
    }

    #[test]
    fn test_window_closes_exactly_at_timeout() {
        let classifier = {
            let mut c = Classifier::new(TIMEOUT);
            c.on_record(&danger(), Instant::now());
            c
        };
        let t = classifier.last_danger.unwrap();
        assert_eq!(classifier.status_at(t + TIMEOUT), ClassificationStatus::Safe);
        assert_eq!(
            classifier.status_at(t + TIMEOUT - Duration::from_millis(1)),
            ClassificationStatus::Danger
        );
    }

    #[test]
    fn test_new_marker_extends_window() {
        let mut classifier = Classifier::new(TIMEOUT);
        let t0 = Instant::now();
        classifier.on_record(&danger(), t0);
        classifier.on_record(&danger(), t0 + Duration::from_millis(600));

        let eval = classifier.on_tick(t0 + Duration::from_millis(1200));
        assert_eq!(eval.status, ClassificationStatus::Danger);
        assert!(!eval.changed);

        let eval = classifier.on_tick(t0 + Duration::from_millis(1400));
        assert_eq!(eval.status, ClassificationStatus::Safe);
    }

    #[test]
    fn test_forget_emitted_re_emits() {
        let mut classifier = Classifier::new(TIMEOUT);
        let t0 = Instant::now();
        assert!(classifier.on_tick(t0).changed);
        assert!(!classifier.on_tick(t0).changed);
        classifier.forget_emitted();
        let eval = classifier.on_tick(t0);
        assert!(eval.changed);
        assert_eq!(eval.status, ClassificationStatus::Safe);
    }

    #[test]
    fn test_non_marker_lines_do_not_open_window() {
        let mut classifier = Classifier::new(TIMEOUT);
        let eval = classifier.on_record(&plain(), Instant::now());
        assert_eq!(eval.status, ClassificationStatus::Safe);
    }
}
