use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use packcam_core::models::ClipItem;
use packcam_core::{CameraSource, CaptureError, LiveStream, RecordedClip};
use uuid::Uuid;

/// Clip for `awb` with a distinct recording second so filenames sort by index.
pub fn clip(awb: &str, index: u32) -> ClipItem {
    let recorded_at = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, index)
        .single()
        .unwrap();
    ClipItem::new(
        Uuid::new_v4(),
        awb,
        "video/webm",
        Bytes::from(format!("clip-{awb}-{index}")),
        recorded_at,
    )
}

/// Camera whose every recording yields the same bytes.
pub struct FixtureCamera {
    pub payload: Bytes,
}

struct FixtureStream {
    payload: Bytes,
}

#[async_trait]
impl CameraSource for FixtureCamera {
    async fn acquire(&self) -> Result<Box<dyn LiveStream>, CaptureError> {
        Ok(Box::new(FixtureStream {
            payload: self.payload.clone(),
        }))
    }

    async fn release(&self, _stream: Box<dyn LiveStream>) {}
}

#[async_trait]
impl LiveStream for FixtureStream {
    fn is_live(&self) -> bool {
        true
    }

    async fn start_recording(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<RecordedClip, CaptureError> {
        Ok(RecordedClip {
            payload: self.payload.clone(),
            content_type: "video/webm".to_string(),
        })
    }
}
