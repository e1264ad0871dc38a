use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use packcam_core::models::{TransferResponse, UploadTarget};
use packcam_core::{DeliveryConfig, DeliveryError, UploadCollaborator};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;

use crate::{apply_auth, build_client, error_text, Auth};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetRequest<'a> {
    filename: &'a str,
    content_type: &'a str,
}

/// Upload collaborator over HTTP.
///
/// Step 1 is an authenticated `POST {endpoint}` with `{filename, contentType}` that
/// returns an [`UploadTarget`]. Step 2 sends the payload to the target URL without the
/// API credentials; the target carries its own authorization.
#[derive(Clone, Debug)]
pub struct HttpUploadClient {
    client: Client,
    endpoint: String,
    auth: Option<Auth>,
}

impl HttpUploadClient {
    pub fn new(endpoint: impl Into<String>, auth: Option<Auth>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            auth,
        })
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        let endpoint = config
            .upload_endpoint
            .clone()
            .context("Missing upload endpoint. Set PACKCAM_UPLOAD_URL")?;
        Self::new(
            endpoint,
            Auth::from_api_key(config.api_key.as_deref()),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UploadCollaborator for HttpUploadClient {
    async fn request_upload_target(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadTarget, DeliveryError> {
        let request = self.client.post(&self.endpoint).json(&TargetRequest {
            filename,
            content_type,
        });
        let request = apply_auth(request, self.auth.as_ref());

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::TargetRequest(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = error_text(response).await;
            return Err(DeliveryError::TargetRequest(format!(
                "Upload target request failed with status {}: {}",
                status, error_text
            )));
        }

        let target: UploadTarget = response.json().await.map_err(|e| {
            DeliveryError::TargetRequest(format!("Failed to parse upload target: {}", e))
        })?;

        tracing::debug!(filename, method = %target.method, "Upload target received");
        Ok(target)
    }

    async fn transfer(
        &self,
        target: &UploadTarget,
        content_type: &str,
        payload: Bytes,
    ) -> Result<TransferResponse, DeliveryError> {
        let method = Method::from_bytes(target.method.to_uppercase().as_bytes()).map_err(|_| {
            DeliveryError::Transfer(format!("Unsupported transfer method: {}", target.method))
        })?;

        let mut request = self.client.request(method, &target.put_url);
        let has_content_type = target
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        if !has_content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        for (name, value) in &target.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .body(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transfer(format!("Failed to send payload: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| DeliveryError::Transfer(format!("Failed to read response: {}", e)))?;

        Ok(TransferResponse { status, body })
    }
}
