use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use packcam_core::models::DeliveryNotice;
use packcam_core::{DeliveryConfig, DeliveryError, NotificationCollaborator};
use reqwest::Client;

use crate::{apply_auth, build_client, error_text, Auth};

/// Notification collaborator: `POST {endpoint}` with the [`DeliveryNotice`] as JSON.
#[derive(Clone, Debug)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    auth: Option<Auth>,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, auth: Option<Auth>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            auth,
        })
    }

    pub fn from_config(config: &DeliveryConfig) -> Result<Self> {
        let endpoint = config
            .notify_endpoint
            .clone()
            .context("Missing notification endpoint. Set PACKCAM_NOTIFY_URL")?;
        Self::new(
            endpoint,
            Auth::from_api_key(config.api_key.as_deref()),
            Duration::from_secs(config.http_timeout_secs),
        )
    }
}

#[async_trait]
impl NotificationCollaborator for HttpNotifier {
    async fn notify_delivered(&self, notice: &DeliveryNotice) -> Result<(), DeliveryError> {
        let request = apply_auth(
            self.client.post(&self.endpoint).json(notice),
            self.auth.as_ref(),
        );

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Notification(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = error_text(response).await;
            return Err(DeliveryError::Notification(format!(
                "Notification failed with status {}: {}",
                status, error_text
            )));
        }

        tracing::debug!(shipment_code = %notice.shipment_code, "Delivery notification acknowledged");
        Ok(())
    }
}
