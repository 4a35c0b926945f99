//! [`RecordingReporter`] keeps an owned copy of every run event.

use rebalance_core::{Reporter, RunEvent, Severity};

/// Owned snapshot of one [`RunEvent`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub severity: Severity,
    pub message: String,
    /// Set for progress events only
    pub percent: Option<f64>,
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<RecordedEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentages of every progress event, in order.
    pub fn percents(&self) -> Vec<f64> {
        self.events.iter().filter_map(|e| e.percent).collect()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.message.as_str()).collect()
    }

    /// Messages at `severity`.
    pub fn at(&self, severity: Severity) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Whether any recorded message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.message.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&mut self, event: &RunEvent<'_>) {
        let percent = match event {
            RunEvent::Progress { progress, .. } => Some(progress.percent()),
            _ => None,
        };
        self.events.push(RecordedEvent {
            severity: event.severity(),
            message: event.to_string(),
            percent,
        });
    }
}
