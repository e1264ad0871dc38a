//! Upload worker pool: bounded concurrent draining of the clip queue.
//!
//! The pool wakes on enqueue, on attempt completion, and on a slow idle poll. Each wake
//! claims clips while a permit is free and a pending clip exists, so the number of clips
//! in `UPLOADING` never exceeds `max_concurrency`.
//!
//! Delivery is at-most-once: a concluded attempt removes its clip whether it succeeded or
//! not, and nothing is retried.
//!
//! Shutdown: [`UploadWorkerPool::shutdown`] stops further claims. In-flight attempts are
//! not cancelled; they run to completion and still publish their outcome.

use std::sync::Arc;

use packcam_core::models::DeliveryOutcome;
use packcam_core::WorkerConfig;
use tokio::sync::{broadcast, mpsc, Notify, Semaphore};
use tokio::time::sleep;

use crate::context::DeliveryContext;
use crate::delivery::deliver;
use crate::queue::{ClaimedClip, ClipQueue};

const OUTCOME_CHANNEL_CAPACITY: usize = 64;

pub struct UploadWorkerPool {
    queue: ClipQueue,
    outcomes_tx: broadcast::Sender<DeliveryOutcome>,
    shutdown_tx: mpsc::Sender<()>,
}

impl UploadWorkerPool {
    /// Spawn the pool's dispatch loop on the current runtime.
    pub fn new(queue: ClipQueue, context: Arc<DeliveryContext>, config: WorkerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (outcomes_tx, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        let queue_clone = queue.clone();
        let outcomes_clone = outcomes_tx.clone();
        tokio::spawn(async move {
            Self::worker_pool(queue_clone, context, config, outcomes_clone, shutdown_rx).await;
        });

        Self {
            queue,
            outcomes_tx,
            shutdown_tx,
        }
    }

    pub fn queue(&self) -> &ClipQueue {
        &self.queue
    }

    /// Feed of concluded attempts. Subscribe before enqueueing to observe every outcome.
    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<DeliveryOutcome> {
        self.outcomes_tx.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_pool(
        queue: ClipQueue,
        context: Arc<DeliveryContext>,
        config: WorkerConfig,
        outcomes_tx: broadcast::Sender<DeliveryOutcome>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_concurrency = config.max_concurrency,
            idle_poll_ms = config.idle_poll_interval.as_millis() as u64,
            "Upload worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        let completed = Arc::new(Notify::new());

        loop {
            Self::dispatch_available(&queue, &semaphore, &context, &outcomes_tx, &completed).await;

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Upload worker pool shutting down");
                    break;
                }
                _ = queue.enqueued() => {}
                _ = completed.notified() => {}
                _ = sleep(config.idle_poll_interval) => {}
            }
        }

        tracing::info!(
            in_flight = queue.status().active_workers,
            "Upload worker pool stopped"
        );
    }

    /// Claim and spawn attempts until permits or pending clips run out.
    async fn dispatch_available(
        queue: &ClipQueue,
        semaphore: &Arc<Semaphore>,
        context: &Arc<DeliveryContext>,
        outcomes_tx: &broadcast::Sender<DeliveryOutcome>,
        completed: &Arc<Notify>,
    ) {
        loop {
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::trace!("All upload workers busy, skipping claim");
                    return;
                }
            };

            let Some(clip) = queue.claim_next().await else {
                drop(permit);
                tracing::trace!("No pending clips in queue");
                return;
            };

            let queue = queue.clone();
            let context = context.clone();
            let outcomes_tx = outcomes_tx.clone();
            let completed = completed.clone();
            tokio::spawn(async move {
                let clip_id = clip.id;
                let outcome = Self::process_clip(clip, &context).await;

                queue.remove(clip_id).await;
                drop(permit);

                let _ = outcomes_tx.send(outcome);
                completed.notify_one();
            });
        }
    }

    #[tracing::instrument(skip_all, fields(clip_id = %clip.id, attempt = clip.attempts))]
    async fn process_clip(clip: ClaimedClip, context: &DeliveryContext) -> DeliveryOutcome {
        let clip_id = clip.id;
        let shipment_code = clip.awb_code.clone();

        tracing::info!(
            clip_id = %clip_id,
            awb_code = %shipment_code,
            filename = %clip.filename,
            "Delivery attempt started"
        );

        match deliver(
            clip,
            context.uploader.as_ref(),
            context.notifier.as_ref(),
            &context.reference_urls,
        )
        .await
        {
            Ok(reference_url) => {
                tracing::info!(
                    clip_id = %clip_id,
                    awb_code = %shipment_code,
                    reference_url = %reference_url,
                    "Clip delivered"
                );
                DeliveryOutcome::Delivered {
                    clip_id,
                    shipment_code,
                    reference_url,
                }
            }
            Err(e) => {
                tracing::error!(
                    clip_id = %clip_id,
                    awb_code = %shipment_code,
                    step = %e.step(),
                    error_code = e.error_code(),
                    error = %e,
                    "Delivery failed, clip dropped"
                );
                context.console.delivery_failed(&shipment_code, &e.to_string());
                DeliveryOutcome::Failed {
                    clip_id,
                    shipment_code,
                    step: e.step(),
                    error: e.to_string(),
                }
            }
        }
    }
}
