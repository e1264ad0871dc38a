//! Delivery collaborator traits.
//!
//! The upload and notification backends are external; only their request/response
//! contracts are modelled here. HTTP implementations live in `packcam-api-client`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DeliveryError;
use crate::models::{DeliveryNotice, TransferResponse, UploadTarget};

#[async_trait]
pub trait UploadCollaborator: Send + Sync {
    /// Step 1: obtain a one-time target for `filename`.
    async fn request_upload_target(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadTarget, DeliveryError>;

    /// Step 2: send the payload using the target's method and headers.
    ///
    /// Returns the raw response whatever its status; only transport failures are errors.
    async fn transfer(
        &self,
        target: &UploadTarget,
        content_type: &str,
        payload: Bytes,
    ) -> Result<TransferResponse, DeliveryError>;
}

#[async_trait]
pub trait NotificationCollaborator: Send + Sync {
    /// Step 4: report the completed delivery.
    async fn notify_delivered(&self, notice: &DeliveryNotice) -> Result<(), DeliveryError>;
}
