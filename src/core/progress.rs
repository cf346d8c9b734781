//! Observational progress reporting for steps and pipelines.
//!
//! A `Progress` sink receives lifecycle messages so a caller can drive a
//! visual indicator. It is a side channel only; control flow never
//! depends on it.

pub trait Progress {
    fn step_started(&mut self, message: &str);
    fn command_running(&mut self, message: &str);
    fn step_succeeded(&mut self, message: &str);
    fn step_failed(&mut self, message: &str);
}

/// Prefixed stderr reporting (TTY-gated via `log_status!`).
#[derive(Default)]
pub struct TerminalProgress;

impl Progress for TerminalProgress {
    fn step_started(&mut self, message: &str) {
        log_status!("step", "{}", message);
    }

    fn command_running(&mut self, message: &str) {
        log_status!("step", "  {}", message);
    }

    fn step_succeeded(&mut self, message: &str) {
        log_status!("step", "{}", message);
    }

    fn step_failed(&mut self, message: &str) {
        log_status!("step", "{}", message);
    }
}

/// Records every report; used by tests to assert ordering and atomicity.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Vec<ProgressEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started(String),
    Command(String),
    Succeeded(String),
    Failed(String),
}

impl Progress for RecordingProgress {
    fn step_started(&mut self, message: &str) {
        self.events.push(ProgressEvent::Started(message.to_string()));
    }

    fn command_running(&mut self, message: &str) {
        self.events.push(ProgressEvent::Command(message.to_string()));
    }

    fn step_succeeded(&mut self, message: &str) {
        self.events.push(ProgressEvent::Succeeded(message.to_string()));
    }

    fn step_failed(&mut self, message: &str) {
        self.events.push(ProgressEvent::Failed(message.to_string()));
    }
}

impl RecordingProgress {
    pub fn terminal_reports(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Succeeded(_) | ProgressEvent::Failed(_)))
            .count()
    }
}
