//! Hooks and traits for the operator-facing surface
//!
//! The pipeline never talks to a screen or speaker directly. It calls these traits and
//! the hosting application decides how a tone sounds or how a confirmation is asked.

use async_trait::async_trait;

use crate::models::ClipItem;

/// Feedback tones emitted on state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Detected,
    RecordingStarted,
    RecordingStopped,
    Failure,
}

/// Fire-and-forget audible/haptic feedback.
///
/// Implementations must not block; a failed tone is never an error.
pub trait ToneSignal: Send + Sync {
    fn signal(&self, tone: Tone);
}

/// Operator interaction needed by the pipeline.
#[async_trait]
pub trait OperatorConsole: Send + Sync {
    /// Ask whether a recording for `session_code` should be closed by a scan of
    /// `scanned_code`. Returning false keeps the session recording.
    async fn confirm_ambiguous_stop(&self, session_code: &str, scanned_code: &str) -> bool;

    /// Surface a failed delivery once, naming the shipment code.
    fn delivery_failed(&self, shipment_code: &str, error: &str);
}

/// Destination for finished clips. The clip queue is the production implementation.
#[async_trait]
pub trait ClipSink: Send + Sync {
    async fn accept(&self, clip: ClipItem);
}

/// No-op tone used when no feedback device is attached
pub struct NoOpTone;

impl ToneSignal for NoOpTone {
    fn signal(&self, _tone: Tone) {}
}

/// Console that declines every ambiguous close and shows nothing.
/// The worker pool logs every failure regardless of the console.
pub struct NoOpConsole;

#[async_trait]
impl OperatorConsole for NoOpConsole {
    async fn confirm_ambiguous_stop(&self, _session_code: &str, _scanned_code: &str) -> bool {
        false
    }

    fn delivery_failed(&self, _shipment_code: &str, _error: &str) {}
}
