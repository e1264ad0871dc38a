//! Pipeline lifecycle for one capture screen.
//!
//! Mounting creates the clip queue and worker pool and starts the debouncer, capture
//! machine, view projection and status logger. `shutdown` tears them down in dependency
//! order: capture first (closing any open recording into a clip), then the pool.

use std::sync::Arc;

use anyhow::{Context, Result};
use packcam_capture::{run_debouncer, CaptureControl, CaptureMachine, ScanDebouncer};
use packcam_core::models::{CaptureView, DeliveryOutcome, MachineState, ScanEvent};
use packcam_core::{
    CameraSource, ClipSink, NotificationCollaborator, OperatorConsole, PipelineConfig,
    ToneSignal, UploadCollaborator,
};
use packcam_infra::{run_status_logger, StatusIndicator};
use packcam_storage::{LocalFallbackStore, MirroringSink};
use packcam_worker::{ClipQueue, DeliveryContext, PoolStatus, UploadWorkerPool};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

const SCAN_CHANNEL_CAPACITY: usize = 256;
const CONTROL_CHANNEL_CAPACITY: usize = 8;

/// External collaborators the pipeline is mounted with.
pub struct Collaborators {
    pub camera: Arc<dyn CameraSource>,
    pub tone: Arc<dyn ToneSignal>,
    pub console: Arc<dyn OperatorConsole>,
    pub uploader: Arc<dyn UploadCollaborator>,
    pub notifier: Arc<dyn NotificationCollaborator>,
    /// Best-effort local copy of every clip, if enabled.
    pub fallback: Option<Arc<LocalFallbackStore>>,
}

pub struct Pipeline {
    events_tx: mpsc::Sender<ScanEvent>,
    controls_tx: mpsc::Sender<CaptureControl>,
    view_rx: watch::Receiver<CaptureView>,
    queue: ClipQueue,
    pool: UploadWorkerPool,
    max_workers: usize,
    debouncer: JoinHandle<()>,
    capture: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Start every pipeline task on the current runtime.
    pub fn mount(config: &PipelineConfig, collaborators: Collaborators) -> Self {
        let queue = ClipQueue::new();
        let context = Arc::new(DeliveryContext::new(
            collaborators.uploader,
            collaborators.notifier,
            collaborators.console.clone(),
            config.delivery.reference_url_template.clone(),
        ));
        let pool = UploadWorkerPool::new(queue.clone(), context, config.worker.clone());

        let queue_sink: Arc<dyn ClipSink> = Arc::new(queue.clone());
        let sink: Arc<dyn ClipSink> = match collaborators.fallback {
            Some(store) => Arc::new(MirroringSink::new(queue_sink, store)),
            None => queue_sink,
        };

        let machine = CaptureMachine::new(
            config.capture.clone(),
            collaborators.camera,
            collaborators.tone,
            collaborators.console,
            sink,
        );
        let machine_rx = machine.subscribe();

        let (events_tx, events_rx) = mpsc::channel(SCAN_CHANNEL_CAPACITY);
        let (confirmed_tx, confirmed_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (controls_tx, controls_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (stabilizing_tx, stabilizing_rx) = watch::channel(false);
        let (view_tx, view_rx) = watch::channel(CaptureView::Idle);

        let debouncer = tokio::spawn(run_debouncer(
            ScanDebouncer::new(&config.capture),
            events_rx,
            confirmed_tx,
            machine_rx.clone(),
            stabilizing_tx,
        ));
        let capture = tokio::spawn(machine.run(confirmed_rx, controls_rx));

        let max_workers = config.worker.max_concurrency;
        let background = vec![
            tokio::spawn(project_view(machine_rx, stabilizing_rx, view_tx)),
            tokio::spawn(run_status_logger(
                queue.subscribe(),
                view_rx.clone(),
                max_workers,
            )),
        ];

        tracing::info!(
            max_workers,
            local_copy = config.fallback.local_copy_enabled,
            "Capture pipeline mounted"
        );

        Self {
            events_tx,
            controls_tx,
            view_rx,
            queue,
            pool,
            max_workers,
            debouncer,
            capture,
            background,
        }
    }

    /// Feed one raw decoder read.
    pub async fn scan(&self, raw_code: &str) -> Result<()> {
        self.events_tx
            .send(ScanEvent::new(raw_code))
            .await
            .context("Scan debouncer is not running")
    }

    /// Manual stop control.
    pub async fn stop_recording(&self) -> Result<()> {
        self.controls_tx
            .send(CaptureControl::Stop)
            .await
            .context("Capture machine is not running")
    }

    pub fn view(&self) -> CaptureView {
        *self.view_rx.borrow()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<CaptureView> {
        self.view_rx.clone()
    }

    pub fn subscribe_outcomes(&self) -> broadcast::Receiver<DeliveryOutcome> {
        self.pool.subscribe_outcomes()
    }

    pub fn indicator(&self) -> StatusIndicator {
        StatusIndicator {
            capture: self.view(),
            pool: self.queue.status(),
            max_workers: self.max_workers,
        }
    }

    /// Tear the pipeline down.
    ///
    /// An open recording is stopped and enqueued. With `drain`, queued clips are
    /// delivered before the pool stops; without it, unclaimed clips are dropped while
    /// in-flight attempts still run to completion.
    pub async fn shutdown(self, drain: bool) -> Result<()> {
        let _ = self.controls_tx.send(CaptureControl::Shutdown).await;
        self.capture.await.context("Capture machine task panicked")?;

        drop(self.events_tx);
        self.debouncer.await.context("Scan debouncer task panicked")?;

        if drain {
            let pending = self.queue.status().queue_depth;
            if pending > 0 {
                tracing::info!(pending, "Waiting for queued clips to be delivered");
            }
            let mut status = self.queue.subscribe();
            status
                .wait_for(PoolStatus::is_drained)
                .await
                .context("Clip queue closed while draining")?;
        }

        self.pool.shutdown().await;
        for task in self.background {
            task.abort();
        }

        let left = self.queue.len().await;
        if left > 0 {
            tracing::warn!(undelivered = left, "Pipeline stopped with undelivered clips");
        } else {
            tracing::info!("Capture pipeline stopped");
        }
        Ok(())
    }
}

/// Publish the operator-facing view whenever the machine state or the debouncer's
/// pending window changes.
async fn project_view(
    mut machine: watch::Receiver<MachineState>,
    mut stabilizing: watch::Receiver<bool>,
    view: watch::Sender<CaptureView>,
) {
    loop {
        let next = CaptureView::project(
            *machine.borrow_and_update(),
            *stabilizing.borrow_and_update(),
        );
        view.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = %current, to = %next, "Capture view changed");
            *current = next;
            true
        });

        tokio::select! {
            changed = machine.changed() => if changed.is_err() { break },
            changed = stabilizing.changed() => if changed.is_err() { break },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FixtureCamera;
    use crate::console::TerminalConsole;
    use async_trait::async_trait;
    use bytes::Bytes;
    use packcam_core::models::{DeliveryNotice, TransferResponse, UploadTarget};
    use packcam_core::{DeliveryError, NoOpTone};
    use packcam_storage::{DirectoryFolderAccess, MemoryHandleStore};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubUploader;

    #[async_trait]
    impl UploadCollaborator for StubUploader {
        async fn request_upload_target(
            &self,
            filename: &str,
            _content_type: &str,
        ) -> Result<UploadTarget, DeliveryError> {
            Ok(UploadTarget::put(format!("https://upload.test/{filename}")))
        }

        async fn transfer(
            &self,
            _target: &UploadTarget,
            _content_type: &str,
            _payload: Bytes,
        ) -> Result<TransferResponse, DeliveryError> {
            Ok(TransferResponse {
                status: 200,
                body: Bytes::from_static(br#"{"id":"g123"}"#),
            })
        }
    }

    #[derive(Default)]
    struct StubNotifier(Mutex<Vec<DeliveryNotice>>);

    #[async_trait]
    impl NotificationCollaborator for StubNotifier {
        async fn notify_delivered(&self, notice: &DeliveryNotice) -> Result<(), DeliveryError> {
            self.0.lock().unwrap().push(notice.clone());
            Ok(())
        }
    }

    fn collaborators(
        notifier: Arc<StubNotifier>,
        fallback: Option<Arc<LocalFallbackStore>>,
    ) -> Collaborators {
        Collaborators {
            camera: Arc::new(FixtureCamera::from_bytes(
                Bytes::from_static(b"webm"),
                "video/webm",
            )),
            tone: Arc::new(NoOpTone),
            console: Arc::new(TerminalConsole::new(true)),
            uploader: Arc::new(StubUploader),
            notifier,
            fallback,
        }
    }

    async fn hold_code(pipeline: &Pipeline, code: &str, reads: usize) {
        for _ in 0..reads {
            pipeline.scan(code).await.unwrap();
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scan_record_stop_deliver() {
        let notifier = Arc::new(StubNotifier::default());
        let pipeline = Pipeline::mount(
            &PipelineConfig::default(),
            collaborators(notifier.clone(), None),
        );
        let mut outcomes = pipeline.subscribe_outcomes();
        let mut view = pipeline.subscribe_view();

        hold_code(&pipeline, "A1", 5).await;
        assert_eq!(pipeline.view(), CaptureView::Stabilizing);

        view.wait_for(|v| *v == CaptureView::Recording).await.unwrap();
        pipeline.stop_recording().await.unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.shipment_code(), "A1");
        assert!(outcome.is_delivered());
        assert_eq!(
            notifier.0.lock().unwrap()[0].reference_url,
            "https://drive.google.com/file/d/g123/view"
        );

        pipeline.shutdown(true).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn held_item_keeps_recording_past_suppression_window() {
        let notifier = Arc::new(StubNotifier::default());
        let pipeline = Pipeline::mount(
            &PipelineConfig::default(),
            collaborators(notifier.clone(), None),
        );
        let mut outcomes = pipeline.subscribe_outcomes();

        // the item stays in front of the camera through confirmation and beyond
        for _ in 0..70 {
            pipeline.scan("A1").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(pipeline.view(), CaptureView::Recording);
        assert!(outcomes.try_recv().is_err());
        assert!(pipeline.queue.is_empty().await);

        pipeline.stop_recording().await.unwrap();
        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.shipment_code(), "A1");

        pipeline.shutdown(true).await.unwrap();
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rescan_of_same_code_closes_session() {
        let notifier = Arc::new(StubNotifier::default());
        let pipeline = Pipeline::mount(
            &PipelineConfig::default(),
            collaborators(notifier.clone(), None),
        );
        let mut outcomes = pipeline.subscribe_outcomes();
        let mut view = pipeline.subscribe_view();

        hold_code(&pipeline, "A1", 3).await;
        view.wait_for(|v| *v == CaptureView::Recording).await.unwrap();

        // past the suppression window, the same code closes the session
        tokio::time::sleep(Duration::from_secs(3)).await;
        hold_code(&pipeline, "A1", 3).await;

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.shipment_code(), "A1");
        view.wait_for(|v| *v == CaptureView::Idle).await.unwrap();

        pipeline.shutdown(true).await.unwrap();
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_open_recording_and_drains() {
        let notifier = Arc::new(StubNotifier::default());
        let pipeline = Pipeline::mount(
            &PipelineConfig::default(),
            collaborators(notifier.clone(), None),
        );
        let mut view = pipeline.subscribe_view();

        hold_code(&pipeline, "B2", 3).await;
        view.wait_for(|v| *v == CaptureView::Recording).await.unwrap();

        pipeline.shutdown(true).await.unwrap();

        let notices = notifier.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].shipment_code, "B2");
    }

    #[tokio::test]
    async fn local_copy_is_taken_alongside_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("clips");
        let store = Arc::new(LocalFallbackStore::new(
            Arc::new(DirectoryFolderAccess::new(
                Some(folder.clone()),
                dir.path().join("downloads"),
            )),
            Arc::new(MemoryHandleStore::new()),
        ));
        let notifier = Arc::new(StubNotifier::default());
        let config = PipelineConfig {
            capture: packcam_core::CaptureConfig {
                stabilization_window: Duration::from_millis(50),
                rescan_suppression: Duration::from_millis(50),
                settle_delay: Duration::from_millis(10),
            },
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::mount(&config, collaborators(notifier.clone(), Some(store)));
        let mut outcomes = pipeline.subscribe_outcomes();
        let mut view = pipeline.subscribe_view();

        pipeline.scan("C3").await.unwrap();
        view.wait_for(|v| *v == CaptureView::Recording).await.unwrap();
        pipeline.stop_recording().await.unwrap();
        assert!(outcomes.recv().await.unwrap().is_delivered());

        let mut copied = false;
        for _ in 0..100 {
            let found = std::fs::read_dir(&folder)
                .map(|entries| {
                    entries
                        .flatten()
                        .any(|entry| entry.file_name().to_string_lossy().starts_with("C3_"))
                })
                .unwrap_or(false);
            if found {
                copied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(copied, "local copy not written");

        pipeline.shutdown(true).await.unwrap();
    }
}
