use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use packcam_core::models::{DeliveryNotice, DeliveryStep, TransferResponse, UploadTarget};
use packcam_core::{DeliveryError, NotificationCollaborator, OperatorConsole, UploadCollaborator};

/// Upload collaborator with a controllable transfer delay and an optional failing step.
pub struct ScriptedUploader {
    object_id: String,
    transfer_delay: Duration,
    fail_at: Option<DeliveryStep>,
    started: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    transfers: AtomicUsize,
}

impl ScriptedUploader {
    pub fn returning(object_id: &str) -> Self {
        Self {
            object_id: object_id.to_string(),
            transfer_delay: Duration::ZERO,
            fail_at: None,
            started: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    pub fn failing_at(mut self, step: DeliveryStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Filenames in the order their attempts started.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadCollaborator for ScriptedUploader {
    async fn request_upload_target(
        &self,
        filename: &str,
        _content_type: &str,
    ) -> Result<UploadTarget, DeliveryError> {
        self.started.lock().unwrap().push(filename.to_string());
        if self.fail_at == Some(DeliveryStep::RequestTarget) {
            return Err(DeliveryError::TargetRequest("target service down".into()));
        }
        Ok(UploadTarget::put(format!("https://upload.test/{filename}")).with_container("folder-1"))
    }

    async fn transfer(
        &self,
        _target: &UploadTarget,
        _content_type: &str,
        _payload: Bytes,
    ) -> Result<TransferResponse, DeliveryError> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.transfer_delay.is_zero() {
            tokio::time::sleep(self.transfer_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_at == Some(DeliveryStep::Transfer) {
            return Ok(TransferResponse {
                status: 500,
                body: Bytes::from_static(b"upload backend error"),
            });
        }
        Ok(TransferResponse {
            status: 200,
            body: Bytes::from(format!(r#"{{"id":"{}"}}"#, self.object_id)),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<DeliveryNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<DeliveryNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationCollaborator for RecordingNotifier {
    async fn notify_delivered(&self, notice: &DeliveryNotice) -> Result<(), DeliveryError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Console that accepts every ambiguous close and records failure alerts.
#[derive(Default)]
pub struct RecordingConsole {
    failures: Mutex<Vec<String>>,
}

impl RecordingConsole {
    /// Shipment codes of failed deliveries, in alert order.
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperatorConsole for RecordingConsole {
    async fn confirm_ambiguous_stop(&self, _session_code: &str, _scanned_code: &str) -> bool {
        true
    }

    fn delivery_failed(&self, shipment_code: &str, _error: &str) {
        self.failures.lock().unwrap().push(shipment_code.to_string());
    }
}
