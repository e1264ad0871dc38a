//! Capture state machine: IDLE -> DETECTED -> RECORDING -> IDLE.
//!
//! The machine owns at most one [`CaptureSession`] together with its exclusive camera
//! stream. Confirmed scans and manual controls are applied one at a time, so a second
//! confirmation can never open a parallel session: while recording it is routed to the
//! stop path instead.

use std::sync::Arc;

use bytes::Bytes;
use packcam_core::models::{CaptureSession, ClipItem, ConfirmedScan, MachineState};
use packcam_core::{
    CameraSource, CaptureConfig, CaptureError, ClipSink, LiveStream, OperatorConsole,
    RecordedClip, Tone, ToneSignal,
};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Content type recorded for a clip whose recorder failed to deliver a payload.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Manual controls from the capture screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureControl {
    /// Explicit stop button: closes the session unconditionally.
    Stop,
    /// Capture screen unmounted.
    Shutdown,
}

/// What a single input did to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Started { session_id: Uuid, awb_code: String },
    Stopped { clip_id: Uuid, awb_code: String },
    /// An ambiguous close was declined; the session keeps recording.
    Kept { awb_code: String },
    /// Camera or recorder failure; the machine is idle and no session exists.
    Failed { reason: String },
    Ignored,
}

struct ActiveSession {
    session: CaptureSession,
    stream: Box<dyn LiveStream>,
}

pub struct CaptureMachine {
    config: CaptureConfig,
    camera: Arc<dyn CameraSource>,
    tone: Arc<dyn ToneSignal>,
    console: Arc<dyn OperatorConsole>,
    sink: Arc<dyn ClipSink>,
    active: Option<ActiveSession>,
    state_tx: watch::Sender<MachineState>,
}

impl CaptureMachine {
    pub fn new(
        config: CaptureConfig,
        camera: Arc<dyn CameraSource>,
        tone: Arc<dyn ToneSignal>,
        console: Arc<dyn OperatorConsole>,
        sink: Arc<dyn ClipSink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(MachineState::Idle);
        Self {
            config,
            camera,
            tone,
            console,
            sink,
            active: None,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<MachineState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> MachineState {
        *self.state_tx.borrow()
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    fn set_state(&self, state: MachineState) {
        self.state_tx.send_replace(state);
    }

    /// Apply a confirmed scan.
    pub async fn on_confirmed(&mut self, scan: ConfirmedScan) -> CaptureEvent {
        match self.state() {
            MachineState::Idle => self.begin(scan.code).await,
            MachineState::Detected => {
                tracing::warn!(code = %scan.code, "Confirmed scan while settling, ignored");
                CaptureEvent::Ignored
            }
            MachineState::Recording => {
                let Some(awb_code) = self.session().map(|s| s.awb_code.clone()) else {
                    tracing::error!("Recording state without a session, resetting to idle");
                    self.set_state(MachineState::Idle);
                    return CaptureEvent::Ignored;
                };

                if scan.code == awb_code {
                    return self.finish().await;
                }

                tracing::info!(
                    awb_code = %awb_code,
                    scanned = %scan.code,
                    "Different code scanned while recording, asking operator"
                );
                if self
                    .console
                    .confirm_ambiguous_stop(&awb_code, &scan.code)
                    .await
                {
                    self.finish().await
                } else {
                    tracing::info!(awb_code = %awb_code, "Ambiguous close declined, still recording");
                    CaptureEvent::Kept { awb_code }
                }
            }
        }
    }

    /// Manual stop control. Does nothing unless a session is recording.
    pub async fn stop(&mut self) -> CaptureEvent {
        if self.active.is_none() {
            tracing::debug!("Stop requested with no active session");
            return CaptureEvent::Ignored;
        }
        self.finish().await
    }

    async fn begin(&mut self, awb_code: String) -> CaptureEvent {
        let mut stream = match self.camera.acquire().await {
            Ok(stream) => stream,
            Err(e) => return self.fail_closed(&awb_code, e),
        };

        if !stream.is_live() {
            self.camera.release(stream).await;
            return self.fail_closed(
                &awb_code,
                CaptureError::CameraUnavailable("stream is not live".to_string()),
            );
        }

        self.set_state(MachineState::Detected);
        self.tone.signal(Tone::Detected);
        tracing::info!(awb_code = %awb_code, "Shipment detected");

        tokio::time::sleep(self.config.settle_delay).await;

        if let Err(e) = stream.start_recording().await {
            self.camera.release(stream).await;
            return self.fail_closed(&awb_code, e);
        }

        let session = CaptureSession::new(awb_code);
        let event = CaptureEvent::Started {
            session_id: session.session_id,
            awb_code: session.awb_code.clone(),
        };
        tracing::info!(
            session_id = %session.session_id,
            awb_code = %session.awb_code,
            "Recording started"
        );
        self.active = Some(ActiveSession { session, stream });
        self.set_state(MachineState::Recording);
        self.tone.signal(Tone::RecordingStarted);

        event
    }

    async fn finish(&mut self) -> CaptureEvent {
        let Some(ActiveSession {
            session,
            mut stream,
        }) = self.active.take()
        else {
            return CaptureEvent::Ignored;
        };

        let recorded = match stream.stop_recording().await {
            Ok(recorded) => recorded,
            Err(e) => {
                tracing::error!(
                    session_id = %session.session_id,
                    awb_code = %session.awb_code,
                    error = %e,
                    "Recorder failed on stop, enqueueing empty clip"
                );
                RecordedClip {
                    payload: Bytes::new(),
                    content_type: FALLBACK_CONTENT_TYPE.to_string(),
                }
            }
        };
        self.camera.release(stream).await;

        if recorded.payload.is_empty() {
            tracing::warn!(awb_code = %session.awb_code, "Stopped clip is empty");
        }

        let clip = ClipItem::new(
            session.session_id,
            session.awb_code.clone(),
            recorded.content_type,
            recorded.payload,
            session.started_at,
        );
        let clip_id = clip.id;
        tracing::info!(
            session_id = %session.session_id,
            awb_code = %session.awb_code,
            clip_id = %clip_id,
            filename = %clip.filename,
            size_bytes = clip.size_bytes(),
            "Recording stopped"
        );

        self.sink.accept(clip).await;
        self.set_state(MachineState::Idle);
        self.tone.signal(Tone::RecordingStopped);

        CaptureEvent::Stopped {
            clip_id,
            awb_code: session.awb_code,
        }
    }

    fn fail_closed(&self, awb_code: &str, error: CaptureError) -> CaptureEvent {
        tracing::error!(awb_code = %awb_code, error = %error, "Capture failed, staying idle");
        self.set_state(MachineState::Idle);
        self.tone.signal(Tone::Failure);
        CaptureEvent::Failed {
            reason: error.to_string(),
        }
    }

    /// Process confirmed scans and controls until shutdown, then close any open session.
    pub async fn run(
        mut self,
        mut confirmed: mpsc::Receiver<ConfirmedScan>,
        mut controls: mpsc::Receiver<CaptureControl>,
    ) {
        tracing::info!("Capture machine started");
        let mut scans_open = true;

        loop {
            tokio::select! {
                scan = confirmed.recv(), if scans_open => match scan {
                    Some(scan) => {
                        self.on_confirmed(scan).await;
                    }
                    None => scans_open = false,
                },
                control = controls.recv() => match control {
                    Some(CaptureControl::Stop) => {
                        self.stop().await;
                    }
                    Some(CaptureControl::Shutdown) | None => break,
                },
            }
        }

        if self.active.is_some() {
            tracing::info!("Closing open session on shutdown");
            self.finish().await;
        }
        tracing::info!("Capture machine stopped");
    }
}
