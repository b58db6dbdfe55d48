//! Calibration progress events and sinks.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// EVENTS
// =============================================================================

/// Progress of a calibration sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A tenor's Newton solve is starting.
    TenorStarted {
        /// Tenor index.
        tenor_index: usize,
        /// Tenor in years.
        tenor: f64,
    },
    /// One residual evaluation finished.
    Iteration {
        /// Tenor index.
        tenor_index: usize,
        /// Evaluation count within the tenor, starting at 1.
        iteration: u32,
        /// Largest residual magnitude.
        max_residual: f64,
    },
    /// A tenor converged and was written back.
    TenorConverged {
        /// Tenor index.
        tenor_index: usize,
        /// Evaluations used.
        iterations: u32,
    },
    /// A tenor failed; the sweep stops.
    TenorFailed {
        /// Tenor index.
        tenor_index: usize,
        /// Failure class.
        code: ErrorCode,
        /// Error message.
        message: String,
    },
}

// =============================================================================
// SINKS
// =============================================================================

/// Receiver of calibration progress.
pub trait ProgressSink {
    /// Delivers one event.
    fn emit(&mut self, event: ProgressEvent);

    /// Returns true if the sweep should stop before the next tenor.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&mut self, _event: ProgressEvent) {}
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// Forwards events over a channel. Events sent after the receiver is
/// dropped are discarded.
impl ProgressSink for Sender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}

/// Wraps a sink and cancels after a fixed number of tenors.
#[derive(Debug)]
pub struct CancelAfter<S> {
    inner: S,
    remaining: usize,
}

impl<S: ProgressSink> CancelAfter<S> {
    /// Allows `tenors` tenors to finish before cancelling.
    pub fn new(inner: S, tenors: usize) -> Self {
        Self {
            inner,
            remaining: tenors,
        }
    }

    /// The wrapped sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ProgressSink> ProgressSink for CancelAfter<S> {
    fn emit(&mut self, event: ProgressEvent) {
        if matches!(event, ProgressEvent::TenorConverged { .. }) {
            self.remaining = self.remaining.saturating_sub(1);
        }
        self.inner.emit(event);
    }

    fn is_cancelled(&self) -> bool {
        self.remaining == 0 || self.inner.is_cancelled()
    }
}
