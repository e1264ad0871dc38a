use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::constants::DEFAULT_REFERENCE_URL_TEMPLATE;

/// One-time upload target returned by the upload collaborator (step 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    /// URL that accepts the clip payload
    #[serde(alias = "uploadUrl", alias = "url")]
    pub put_url: String,
    /// HTTP method to use for the transfer
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra headers required by the target
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Container/location the object will land in, forwarded to the notification
    #[serde(default, alias = "folderId")]
    pub container_id: Option<String>,
}

fn default_method() -> String {
    "PUT".to_string()
}

impl UploadTarget {
    pub fn put(put_url: impl Into<String>) -> Self {
        Self {
            put_url: put_url.into(),
            method: default_method(),
            headers: HashMap::new(),
            container_id: None,
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }
}

/// Raw response of the payload transfer (step 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransferResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Completion body of a successful transfer; only the durable id is required.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    pub id: String,
}

/// Payload sent to the notification collaborator (step 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNotice {
    pub shipment_code: String,
    pub reference_url: String,
    pub container_id: Option<String>,
}

/// Shareable link pattern with an `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUrlTemplate(String);

impl ReferenceUrlTemplate {
    pub const PLACEHOLDER: &'static str = "{id}";

    pub fn new(template: impl Into<String>) -> Result<Self, anyhow::Error> {
        let template = template.into();
        if !template.contains(Self::PLACEHOLDER) {
            return Err(anyhow::anyhow!(
                "Reference URL template must contain {}: {}",
                Self::PLACEHOLDER,
                template
            ));
        }
        Ok(Self(template))
    }

    pub fn render(&self, object_id: &str) -> String {
        self.0.replace(Self::PLACEHOLDER, object_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ReferenceUrlTemplate {
    fn default() -> Self {
        Self(DEFAULT_REFERENCE_URL_TEMPLATE.to_string())
    }
}

/// Steps of the delivery protocol, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStep {
    RequestTarget,
    Transfer,
    ParseCompletion,
    Notify,
}

impl fmt::Display for DeliveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStep::RequestTarget => write!(f, "request_target"),
            DeliveryStep::Transfer => write!(f, "transfer"),
            DeliveryStep::ParseCompletion => write!(f, "parse_completion"),
            DeliveryStep::Notify => write!(f, "notify"),
        }
    }
}

/// Result of one concluded delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered {
        clip_id: Uuid,
        shipment_code: String,
        reference_url: String,
    },
    Failed {
        clip_id: Uuid,
        shipment_code: String,
        step: DeliveryStep,
        error: String,
    },
}

impl DeliveryOutcome {
    pub fn clip_id(&self) -> Uuid {
        match self {
            DeliveryOutcome::Delivered { clip_id, .. } | DeliveryOutcome::Failed { clip_id, .. } => {
                *clip_id
            }
        }
    }

    pub fn shipment_code(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { shipment_code, .. }
            | DeliveryOutcome::Failed { shipment_code, .. } => shipment_code,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}
