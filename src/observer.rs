//! Diagnostics sink handed to every component.
//!
//! Nothing in the library logs through a process-wide logger directly; callers pass an
//! [`Observer`] so tests can capture or silence output deterministically.

use std::sync::Mutex;
use tracing::Level;

pub trait Observer: Send + Sync {
    fn observe(&self, level: Level, component: &'static str, message: &str);

    fn debug(&self, component: &'static str, message: &str) {
        self.observe(Level::DEBUG, component, message);
    }

    fn info(&self, component: &'static str, message: &str) {
        self.observe(Level::INFO, component, message);
    }

    fn warn(&self, component: &'static str, message: &str) {
        self.observe(Level::WARN, component, message);
    }

    fn error(&self, component: &'static str, message: &str) {
        self.observe(Level::ERROR, component, message);
    }
}

/// Forwards events to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, level: Level, component: &'static str, message: &str) {
        match level {
            Level::ERROR => tracing::error!(component, "{message}"),
            Level::WARN => tracing::warn!(component, "{message}"),
            Level::INFO => tracing::info!(component, "{message}"),
            Level::DEBUG => tracing::debug!(component, "{message}"),
            Level::TRACE => tracing::trace!(component, "{message}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl Observer for SilentObserver {
    fn observe(&self, _level: Level, _component: &'static str, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    pub level: Level,
    pub component: &'static str,
    pub message: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events()
            .iter()
            .any(|event| event.message.contains(needle))
    }
}

impl Observer for RecordingObserver {
    fn observe(&self, level: Level, component: &'static str, message: &str) {
        let event = ObservedEvent {
            level,
            component,
            message: message.to_string(),
        };
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.info("git", "first");
        observer.warn("linter", "second");
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].component, "git");
        assert_eq!(events[1].level, Level::WARN);
        assert!(observer.contains("second"));
        assert!(!observer.contains("third"));
    }
}
