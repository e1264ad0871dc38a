//! Delivery context
//!
//! Bundles the external collaborators a worker needs for one delivery attempt. The
//! pool holds it behind an `Arc` and clones the `Arc` into every spawned attempt.

use std::sync::Arc;

use packcam_core::models::ReferenceUrlTemplate;
use packcam_core::{NotificationCollaborator, OperatorConsole, UploadCollaborator};

pub struct DeliveryContext {
    pub uploader: Arc<dyn UploadCollaborator>,
    pub notifier: Arc<dyn NotificationCollaborator>,
    /// Receives one alert per failed delivery.
    pub console: Arc<dyn OperatorConsole>,
    pub reference_urls: ReferenceUrlTemplate,
}

impl DeliveryContext {
    pub fn new(
        uploader: Arc<dyn UploadCollaborator>,
        notifier: Arc<dyn NotificationCollaborator>,
        console: Arc<dyn OperatorConsole>,
        reference_urls: ReferenceUrlTemplate,
    ) -> Self {
        Self {
            uploader,
            notifier,
            console,
            reference_urls,
        }
    }
}
