use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Upload status of a queued clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClipStatus {
    Pending,
    Uploading,
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipStatus::Pending => write!(f, "PENDING"),
            ClipStatus::Uploading => write!(f, "UPLOADING"),
        }
    }
}

/// A finished recording waiting for delivery.
///
/// Not `Clone`: the payload moves into the queue on enqueue and from the queue into a
/// worker when the clip is claimed.
#[derive(Debug)]
pub struct ClipItem {
    pub id: Uuid,
    pub session_id: Uuid,
    pub awb_code: String,
    pub filename: String,
    pub content_type: String,
    pub payload: Bytes,
    pub status: ClipStatus,
    pub attempts: u32,
    pub recorded_at: DateTime<Utc>,
}

impl ClipItem {
    pub fn new(
        session_id: Uuid,
        awb_code: impl Into<String>,
        content_type: impl Into<String>,
        payload: Bytes,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let awb_code = awb_code.into();
        let content_type = content_type.into();
        let filename = clip_filename(&awb_code, recorded_at, &content_type);
        Self {
            id: Uuid::new_v4(),
            session_id,
            awb_code,
            filename,
            content_type,
            payload,
            status: ClipStatus::Pending,
            attempts: 0,
            recorded_at,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

/// Build the delivery filename: `{awb}_{YYYYMMDD_HHMMSS}.{ext}`.
pub fn clip_filename(awb_code: &str, recorded_at: DateTime<Utc>, content_type: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_code(awb_code),
        recorded_at.format("%Y%m%d_%H%M%S"),
        extension_for(content_type)
    )
}

/// File extension for a recorder MIME type, ignoring codec parameters.
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "video/webm" => "webm",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

fn sanitize_code(code: &str) -> String {
    let cleaned: String = code
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
