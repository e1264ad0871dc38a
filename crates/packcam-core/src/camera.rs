//! Camera collaborator traits.
//!
//! A [`CameraSource`] hands out exclusive live streams. A stream records at most one
//! clip at a time and yields the whole payload when recording stops.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CaptureError;

/// Payload produced when a recording stops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClip {
    pub payload: Bytes,
    /// MIME type reported by the recorder (e.g. `video/webm`)
    pub content_type: String,
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Acquire the live video stream, prompting for permission if needed.
    async fn acquire(&self) -> Result<Box<dyn LiveStream>, CaptureError>;

    /// Stop every track of the stream and give it back.
    async fn release(&self, stream: Box<dyn LiveStream>);
}

#[async_trait]
pub trait LiveStream: Send {
    /// Whether the stream still delivers frames.
    fn is_live(&self) -> bool;

    async fn start_recording(&mut self) -> Result<(), CaptureError>;

    /// Finish the recording and return its single payload.
    async fn stop_recording(&mut self) -> Result<RecordedClip, CaptureError>;
}
