//! The four-step delivery protocol run by each worker.

use packcam_core::models::{DeliveryNotice, ReferenceUrlTemplate, StoredObject};
use packcam_core::{DeliveryError, NotificationCollaborator, UploadCollaborator};

use crate::queue::ClaimedClip;

/// Longest slice of a rejected transfer body carried into the error message.
const REJECTION_BODY_LIMIT: usize = 256;

/// Deliver one clip and return its reference URL.
///
/// Steps run strictly in order; the first failing step aborts the attempt and its error
/// reports which step that was.
#[tracing::instrument(
    skip(clip, uploader, notifier, reference_urls),
    fields(clip.id = %clip.id, awb_code = %clip.awb_code, attempt = clip.attempts)
)]
pub async fn deliver(
    clip: ClaimedClip,
    uploader: &dyn UploadCollaborator,
    notifier: &dyn NotificationCollaborator,
    reference_urls: &ReferenceUrlTemplate,
) -> Result<String, DeliveryError> {
    if clip.payload.is_empty() {
        tracing::warn!(filename = %clip.filename, "Delivering empty clip");
    }

    let target = uploader
        .request_upload_target(&clip.filename, &clip.content_type)
        .await?;
    tracing::debug!(
        method = %target.method,
        container_id = ?target.container_id,
        "Upload target obtained"
    );

    let size_bytes = clip.payload.len();
    let response = uploader
        .transfer(&target, &clip.content_type, clip.payload)
        .await?;
    if !response.is_success() {
        let body = String::from_utf8_lossy(&response.body);
        return Err(DeliveryError::TransferRejected {
            status: response.status,
            message: body.chars().take(REJECTION_BODY_LIMIT).collect(),
        });
    }
    tracing::debug!(status = response.status, size_bytes, "Payload transferred");

    let object_id = parse_object_id(&response.body)?;
    let reference_url = reference_urls.render(&object_id);

    let notice = DeliveryNotice {
        shipment_code: clip.awb_code,
        reference_url: reference_url.clone(),
        container_id: target.container_id,
    };
    notifier.notify_delivered(&notice).await?;

    Ok(reference_url)
}

/// Extract the durable object id from a transfer completion body.
pub fn parse_object_id(body: &[u8]) -> Result<String, DeliveryError> {
    let stored: StoredObject = serde_json::from_slice(body)
        .map_err(|e| DeliveryError::InvalidCompletion(e.to_string()))?;

    let id = stored.id.trim();
    if id.is_empty() {
        return Err(DeliveryError::InvalidCompletion(
            "completion body has an empty id".to_string(),
        ));
    }
    Ok(id.to_string())
}
