//! HTTP clients for the delivery collaborators.
//!
//! [`HttpUploadClient`] asks the upload service for a one-time target and transfers the
//! clip to it; [`HttpNotifier`] reports completed deliveries. Both share the auth
//! strategy and client construction defined here.

pub mod notify;
pub mod upload;

pub use notify::HttpNotifier;
pub use upload::HttpUploadClient;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Authentication strategy for the collaborator endpoints.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

impl Auth {
    /// X-API-Key auth when a key is configured.
    pub fn from_api_key(api_key: Option<&str>) -> Option<Self> {
        api_key
            .filter(|key| !key.is_empty())
            .map(|key| Auth::XApiKey(key.to_string()))
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

pub(crate) fn apply_auth(
    request: reqwest::RequestBuilder,
    auth: Option<&Auth>,
) -> reqwest::RequestBuilder {
    match auth {
        Some(Auth::Bearer(token)) => request.header("Authorization", format!("Bearer {}", token)),
        Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
        None => request,
    }
}

/// Read an error body for a failed response, tolerating unreadable bodies.
pub(crate) async fn error_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
