//! Error types module
//!
//! The pipeline distinguishes capture errors, which fail closed back to idle, from
//! delivery errors, which are terminal for a single upload attempt. Fallback-save errors
//! live in the storage crate because they never leave it.

use crate::models::DeliveryStep;

/// Failures while acquiring the camera or driving the recorder.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recorder failed: {0}")]
    RecorderFailed(String),
}

/// Failures of the four-step delivery protocol.
///
/// Each variant belongs to exactly one protocol step so the operator alert can say
/// where the attempt stopped.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Upload target request failed: {0}")]
    TargetRequest(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Transfer rejected with status {status}: {message}")]
    TransferRejected { status: u16, message: String },

    #[error("Completion response invalid: {0}")]
    InvalidCompletion(String),

    #[error("Notification failed: {0}")]
    Notification(String),
}

impl DeliveryError {
    /// Protocol step at which this error occurred.
    pub fn step(&self) -> DeliveryStep {
        match self {
            DeliveryError::TargetRequest(_) => DeliveryStep::RequestTarget,
            DeliveryError::Transfer(_) | DeliveryError::TransferRejected { .. } => {
                DeliveryStep::Transfer
            }
            DeliveryError::InvalidCompletion(_) => DeliveryStep::ParseCompletion,
            DeliveryError::Notification(_) => DeliveryStep::Notify,
        }
    }

    /// Machine-readable error code (e.g., "TRANSFER_REJECTED")
    pub fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::TargetRequest(_) => "TARGET_REQUEST_FAILED",
            DeliveryError::Transfer(_) => "TRANSFER_FAILED",
            DeliveryError::TransferRejected { .. } => "TRANSFER_REJECTED",
            DeliveryError::InvalidCompletion(_) => "INVALID_COMPLETION",
            DeliveryError::Notification(_) => "NOTIFICATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_errors_map_to_their_step() {
        assert_eq!(
            DeliveryError::TargetRequest("x".into()).step(),
            DeliveryStep::RequestTarget
        );
        assert_eq!(
            DeliveryError::TransferRejected {
                status: 503,
                message: "busy".into()
            }
            .step(),
            DeliveryStep::Transfer
        );
        assert_eq!(
            DeliveryError::InvalidCompletion("no id".into()).step(),
            DeliveryStep::ParseCompletion
        );
        assert_eq!(
            DeliveryError::Notification("down".into()).step(),
            DeliveryStep::Notify
        );
    }

    #[test]
    fn rejected_transfer_message_carries_status() {
        let err = DeliveryError::TransferRejected {
            status: 403,
            message: "expired".into(),
        };
        assert_eq!(err.to_string(), "Transfer rejected with status 403: expired");
        assert_eq!(err.error_code(), "TRANSFER_REJECTED");
    }
}
