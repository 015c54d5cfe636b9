//! Advisory progress reporting.
//!
//! The engine tells a display collaborator which splash to show and never
//! waits on or reads anything back from it. Later notifications supersede
//! earlier ones.

pub mod splash;

pub use splash::{StatusFileSink, TerminalSplash};

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    /// Nothing the operator needs to know about
    Idle,
    /// Recovery mirror is being rebuilt
    Updating,
    /// At least one live file is being repaired
    Warning,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Idle => "idle",
            ProgressState::Updating => "updating",
            ProgressState::Warning => "warning",
        }
    }

    /// Boot splash image shown for this state
    pub fn splash_name(&self) -> &'static str {
        match self {
            ProgressState::Idle => "roth_splash.bmp",
            ProgressState::Updating => "update_splash.bmp",
            ProgressState::Warning => "warning_splash.bmp",
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ProgressSink {
    fn notify(&self, state: ProgressState);
}

/// Discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _state: ProgressState) {}
}

/// Forwards each notification to every inner sink, in order
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ProgressSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ProgressSink for MultiSink {
    fn notify(&self, state: ProgressState) {
        for sink in &self.sinks {
            sink.notify(state);
        }
    }
}

/// Keeps every notification, for callers that want to inspect the sequence
#[derive(Debug, Default)]
pub struct RecordingSink {
    states: Mutex<Vec<ProgressState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<ProgressState> {
        self.states.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The state a last-write-wins display would currently show
    pub fn current(&self) -> Option<ProgressState> {
        self.states().last().copied()
    }
}

impl ProgressSink for RecordingSink {
    fn notify(&self, state: ProgressState) {
        if let Ok(mut states) = self.states.lock() {
            states.push(state);
        }
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for &T {
    fn notify(&self, state: ProgressState) {
        (**self).notify(state)
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for Box<T> {
    fn notify(&self, state: ProgressState) {
        (**self).notify(state)
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for std::sync::Arc<T> {
    fn notify(&self, state: ProgressState) {
        (**self).notify(state)
    }
}

#[cfg(test)]
mod splash_tests;
