use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Authoritative states owned by the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineState {
    Idle,
    /// Transient feedback phase between confirmation and the start of capture.
    Detected,
    Recording,
}

/// Externally visible capture state.
///
/// `Stabilizing` is not a machine state: it is the projection of the debouncer's
/// pending window onto an idle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureView {
    Idle,
    Stabilizing,
    Detected,
    Recording,
}

impl CaptureView {
    pub fn project(machine: MachineState, stabilizing: bool) -> Self {
        match machine {
            MachineState::Idle if stabilizing => CaptureView::Stabilizing,
            MachineState::Idle => CaptureView::Idle,
            MachineState::Detected => CaptureView::Detected,
            MachineState::Recording => CaptureView::Recording,
        }
    }
}

impl fmt::Display for CaptureView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaptureView::Idle => "IDLE",
            CaptureView::Stabilizing => "STABILIZING",
            CaptureView::Detected => "DETECTED",
            CaptureView::Recording => "RECORDING",
        };
        f.write_str(label)
    }
}

/// Identity of the single live recording session.
///
/// The stream handle that belongs to the session is held next to this record by the
/// state machine; `awb_code` never changes once the session exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub session_id: Uuid,
    pub awb_code: String,
    pub started_at: DateTime<Utc>,
}

impl CaptureSession {
    pub fn new(awb_code: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            awb_code: awb_code.into(),
            started_at: Utc::now(),
        }
    }
}
