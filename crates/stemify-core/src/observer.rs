//! Progress observer
//!
//! The embedding application owns its observer; the processor only keeps a
//! `Weak` handle. Once the observer is dropped, notifications become no-ops.
//!
//! ## Contract
//!
//! - `on_processing_start` fires once when a run begins
//! - `on_progress_update` fires whenever progress advanced by at least the
//!   configured threshold, and once with exactly `1.0` on completion
//! - `on_processing_finish` fires on completion, including silent early stops
//! - `on_processing_error` fires instead of the final progress/finish pair when
//!   a run is cut short by an engine returning the wrong number of stems
//!
//! Calls are synchronous and inline with the processing loop.

use std::sync::{Arc, Weak};

/// Receives lifecycle and progress notifications from the processor
pub trait ProgressObserver: Send + Sync {
    /// A run has started
    fn on_processing_start(&self);

    /// Fraction of the output finalized so far, in `[0.0, 1.0]`
    fn on_progress_update(&self, progress: f32);

    /// A run has completed
    fn on_processing_finish(&self) {}

    /// A run was cut short
    fn on_processing_error(&self, _message: &str) {}
}

/// Non-owning handle to an optional observer
#[derive(Clone, Default)]
pub struct ObserverHandle {
    inner: Option<Weak<dyn ProgressObserver>>,
}

impl ObserverHandle {
    /// Handle that never notifies anyone
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// Observe `observer` without extending its lifetime
    pub fn new(observer: &Arc<dyn ProgressObserver>) -> Self {
        Self {
            inner: Some(Arc::downgrade(observer)),
        }
    }

    /// Check whether the observer is still alive
    pub fn is_attached(&self) -> bool {
        self.upgrade().is_some()
    }

    fn upgrade(&self) -> Option<Arc<dyn ProgressObserver>> {
        self.inner.as_ref().and_then(Weak::upgrade)
    }

    pub fn start(&self) {
        if let Some(observer) = self.upgrade() {
            observer.on_processing_start();
        }
    }

    pub fn progress(&self, progress: f32) {
        if let Some(observer) = self.upgrade() {
            observer.on_progress_update(progress);
        }
    }

    pub fn finish(&self) {
        if let Some(observer) = self.upgrade() {
            observer.on_processing_finish();
        }
    }

    pub fn error(&self, message: &str) {
        if let Some(observer) = self.upgrade() {
            observer.on_processing_error(message);
        }
    }
}

impl std::fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Observer that records every notification, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<ObserverEvent>>,
}

/// A single recorded notification
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Start,
    Progress(f32),
    Finish,
    Error(String),
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, in order
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Only the progress values, in order
    pub fn progress_values(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObserverEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_processing_start(&self) {
        self.push(ObserverEvent::Start);
    }

    fn on_progress_update(&self, progress: f32) {
        self.push(ObserverEvent::Progress(progress));
    }

    fn on_processing_finish(&self) {
        self.push(ObserverEvent::Finish);
    }

    fn on_processing_error(&self, message: &str) {
        self.push(ObserverEvent::Error(message.to_string()));
    }
}
