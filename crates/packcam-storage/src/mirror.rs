use std::sync::Arc;

use async_trait::async_trait;
use packcam_core::models::ClipItem;
use packcam_core::ClipSink;

use crate::fallback::LocalFallbackStore;

/// Clip sink that takes a best-effort local copy of every clip before forwarding it.
///
/// The copy runs on its own task, so a slow folder prompt or write never delays the
/// clip reaching the upload queue.
pub struct MirroringSink {
    inner: Arc<dyn ClipSink>,
    store: Arc<LocalFallbackStore>,
}

impl MirroringSink {
    pub fn new(inner: Arc<dyn ClipSink>, store: Arc<LocalFallbackStore>) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl ClipSink for MirroringSink {
    async fn accept(&self, clip: ClipItem) {
        let store = self.store.clone();
        let payload = clip.payload.clone();
        let filename = clip.filename.clone();
        tokio::spawn(async move {
            store.save(payload, &filename).await;
        });

        self.inner.accept(clip).await;
    }
}
