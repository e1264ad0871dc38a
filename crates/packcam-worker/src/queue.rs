//! Pending-clip queue.
//!
//! FIFO by enqueue time, no deduplication: two clips for the same shipment code are
//! independent deliveries. A clip stays visible while it uploads (status `UPLOADING`) and
//! is removed once its attempt concludes, whatever the result. Every mutation publishes a
//! fresh [`PoolStatus`] under the same lock, so observers never see a half-applied change.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use packcam_core::models::{ClipItem, ClipStatus};
use packcam_core::ClipSink;
use serde::Serialize;
use tokio::sync::{watch, Mutex, Notify};
use uuid::Uuid;

/// Queue depth and worker activity, shown to the operator at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub queue_depth: usize,
    pub pending: usize,
    pub uploading: usize,
    /// Workers running a delivery attempt. Each holds exactly one `UPLOADING` clip until
    /// the attempt concludes and the clip is removed.
    pub active_workers: usize,
}

impl PoolStatus {
    /// Nothing queued and nothing in flight: safe to power off.
    pub fn is_drained(&self) -> bool {
        self.queue_depth == 0
    }
}

/// Metadata view of a queued clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSummary {
    pub id: Uuid,
    pub awb_code: String,
    pub filename: String,
    pub status: ClipStatus,
    pub attempts: u32,
    pub size_bytes: usize,
}

impl From<&ClipItem> for ClipSummary {
    fn from(clip: &ClipItem) -> Self {
        Self {
            id: clip.id,
            awb_code: clip.awb_code.clone(),
            filename: clip.filename.clone(),
            status: clip.status,
            attempts: clip.attempts,
            size_bytes: clip.size_bytes(),
        }
    }
}

/// A clip owned by a worker for the duration of one delivery attempt.
#[derive(Debug)]
pub struct ClaimedClip {
    pub id: Uuid,
    pub awb_code: String,
    pub filename: String,
    pub content_type: String,
    pub payload: Bytes,
    pub attempts: u32,
}

struct QueueInner {
    items: Mutex<VecDeque<ClipItem>>,
    wakeup: Notify,
    status_tx: watch::Sender<PoolStatus>,
}

#[derive(Clone)]
pub struct ClipQueue {
    inner: Arc<QueueInner>,
}

impl Default for ClipQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipQueue {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(PoolStatus::default());
        Self {
            inner: Arc::new(QueueInner {
                items: Mutex::new(VecDeque::new()),
                wakeup: Notify::new(),
                status_tx,
            }),
        }
    }

    /// Append a finished clip and wake the worker pool.
    pub async fn enqueue(&self, mut clip: ClipItem) -> Uuid {
        let id = clip.id;
        clip.status = ClipStatus::Pending;

        let mut items = self.inner.items.lock().await;
        tracing::info!(
            clip_id = %id,
            awb_code = %clip.awb_code,
            filename = %clip.filename,
            queue_depth = items.len() + 1,
            "Clip enqueued"
        );
        items.push_back(clip);
        self.publish(&items);
        drop(items);

        self.inner.wakeup.notify_one();
        id
    }

    pub async fn peek_oldest(&self) -> Option<ClipSummary> {
        self.inner.items.lock().await.front().map(ClipSummary::from)
    }

    /// Remove a clip regardless of its status.
    pub async fn remove(&self, id: Uuid) -> Option<ClipItem> {
        let mut items = self.inner.items.lock().await;
        let position = items.iter().position(|clip| clip.id == id)?;
        let removed = items.remove(position);
        self.publish(&items);
        removed
    }

    /// Hand the oldest pending clip to a worker.
    ///
    /// The entry stays queued as `UPLOADING`; its payload moves into the returned claim.
    pub async fn claim_next(&self) -> Option<ClaimedClip> {
        let mut items = self.inner.items.lock().await;
        let clip = items
            .iter_mut()
            .find(|clip| clip.status == ClipStatus::Pending)?;

        clip.status = ClipStatus::Uploading;
        clip.attempts += 1;
        let claimed = ClaimedClip {
            id: clip.id,
            awb_code: clip.awb_code.clone(),
            filename: clip.filename.clone(),
            content_type: clip.content_type.clone(),
            payload: std::mem::take(&mut clip.payload),
            attempts: clip.attempts,
        };
        self.publish(&items);
        Some(claimed)
    }

    pub async fn len(&self) -> usize {
        self.inner.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.items.lock().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<ClipSummary> {
        self.inner
            .items
            .lock()
            .await
            .iter()
            .map(ClipSummary::from)
            .collect()
    }

    pub fn status(&self) -> PoolStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PoolStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Resolves after the next enqueue (or immediately if one happened unobserved).
    pub(crate) async fn enqueued(&self) {
        self.inner.wakeup.notified().await;
    }

    fn publish(&self, items: &VecDeque<ClipItem>) {
        let uploading = items
            .iter()
            .filter(|clip| clip.status == ClipStatus::Uploading)
            .count();
        self.inner.status_tx.send_replace(PoolStatus {
            queue_depth: items.len(),
            pending: items.len() - uploading,
            uploading,
            active_workers: uploading,
        });
    }
}

#[async_trait]
impl ClipSink for ClipQueue {
    async fn accept(&self, clip: ClipItem) {
        self.enqueue(clip).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn clip(awb: &str) -> ClipItem {
        ClipItem::new(
            Uuid::new_v4(),
            awb,
            "video/webm",
            Bytes::from(format!("payload-{awb}")),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn oldest_clip_is_offered_first() {
        let queue = ClipQueue::new();
        let a = queue.enqueue(clip("A")).await;
        let b = queue.enqueue(clip("B")).await;
        queue.enqueue(clip("C")).await;

        assert_eq!(queue.peek_oldest().await.unwrap().id, a);
        assert_eq!(queue.claim_next().await.unwrap().id, a);
        assert_eq!(queue.claim_next().await.unwrap().id, b);
    }

    #[tokio::test]
    async fn same_shipment_code_is_not_deduplicated() {
        let queue = ClipQueue::new();
        queue.enqueue(clip("A1")).await;
        queue.enqueue(clip("A1")).await;
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn claim_marks_uploading_and_moves_payload() {
        let queue = ClipQueue::new();
        let id = queue.enqueue(clip("A1")).await;

        let claimed = queue.claim_next().await.unwrap();
        assert_eq!(claimed.payload, Bytes::from("payload-A1"));
        assert_eq!(claimed.attempts, 1);

        let summary = queue.peek_oldest().await.unwrap();
        assert_eq!(summary.id, id);
        assert_eq!(summary.status, ClipStatus::Uploading);
        assert_eq!(summary.size_bytes, 0);

        assert!(queue.claim_next().await.is_none());
    }

    #[tokio::test]
    async fn status_tracks_depth_and_active_workers() {
        let queue = ClipQueue::new();
        let status = queue.subscribe();
        queue.enqueue(clip("A")).await;
        queue.enqueue(clip("B")).await;
        let claimed = queue.claim_next().await.unwrap();

        assert_eq!(
            *status.borrow(),
            PoolStatus {
                queue_depth: 2,
                pending: 1,
                uploading: 1,
                active_workers: 1
            }
        );

        queue.remove(claimed.id).await.unwrap();
        assert_eq!(queue.status().queue_depth, 1);
        assert_eq!(queue.status().active_workers, 0);
        assert!(!queue.status().is_drained());
    }

    #[tokio::test]
    async fn remove_unknown_id_is_none() {
        let queue = ClipQueue::new();
        assert!(queue.remove(Uuid::new_v4()).await.is_none());
        assert!(queue.is_empty().await);
        assert!(queue.status().is_drained());
    }
}
