//! Logging sink for engine events.
//!
//! The engine reports every validation issue, every repair substitution and
//! every top-level failure through a `PackObserver`. The default forwards to
//! `tracing`; tests use `RecordingObserver` to assert on what was reported.

use packfix_schema::{ManifestIssue, RepairNote};
use std::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

pub trait PackObserver: Send + Sync {
    fn event(&self, level: EventLevel, message: &str);

    fn issue(&self, issue: &ManifestIssue) {
        self.event(EventLevel::Info, &format!("manifest issue: {issue}"));
    }

    fn repair_note(&self, note: &RepairNote) {
        self.event(EventLevel::Info, &format!("repair: {note}"));
    }

    fn failure(&self, error: &crate::CoreError) {
        self.event(EventLevel::Error, &error.to_string());
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PackObserver for TracingObserver {
    fn event(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => info!("{message}"),
            EventLevel::Warn => warn!("{message}"),
            EventLevel::Error => error!("{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub level: EventLevel,
    pub message: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }
}

impl PackObserver for RecordingObserver {
    fn event(&self, level: EventLevel, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                level,
                message: message.to_owned(),
            });
        }
    }
}
