//! Fixture camera for terminal runs.
//!
//! Every recording yields the bytes of a fixture file, or a short synthetic payload when
//! no fixture is configured.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use packcam_core::{CameraSource, CaptureError, LiveStream, RecordedClip};
use tokio::time::Instant;

const SYNTHETIC_CONTENT_TYPE: &str = "application/octet-stream";

pub struct FixtureCamera {
    fixture: Option<(Bytes, String)>,
    live_streams: Arc<AtomicUsize>,
}

impl FixtureCamera {
    pub fn synthetic() -> Self {
        Self {
            fixture: None,
            live_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_bytes(payload: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            fixture: Some((payload, content_type.into())),
            live_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Ok(Self::from_bytes(Bytes::from(payload), content_type_for(path)))
    }

    /// Streams acquired and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }
}

/// Recorder MIME type for a fixture file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        _ => SYNTHETIC_CONTENT_TYPE,
    }
}

struct FixtureStream {
    fixture: Option<(Bytes, String)>,
    recording_since: Option<Instant>,
}

#[async_trait]
impl CameraSource for FixtureCamera {
    async fn acquire(&self) -> Result<Box<dyn LiveStream>, CaptureError> {
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureStream {
            fixture: self.fixture.clone(),
            recording_since: None,
        }))
    }

    async fn release(&self, _stream: Box<dyn LiveStream>) {
        self.live_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LiveStream for FixtureStream {
    fn is_live(&self) -> bool {
        true
    }

    async fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.recording_since.is_some() {
            return Err(CaptureError::RecorderFailed(
                "recorder already running".to_string(),
            ));
        }
        self.recording_since = Some(Instant::now());
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<RecordedClip, CaptureError> {
        let since = self
            .recording_since
            .take()
            .ok_or_else(|| CaptureError::RecorderFailed("recorder not running".to_string()))?;

        Ok(match &self.fixture {
            Some((payload, content_type)) => RecordedClip {
                payload: payload.clone(),
                content_type: content_type.clone(),
            },
            None => RecordedClip {
                payload: Bytes::from(format!(
                    "packcam synthetic clip, {} ms",
                    since.elapsed().as_millis()
                )),
                content_type: SYNTHETIC_CONTENT_TYPE.to_string(),
            },
        })
    }
}
