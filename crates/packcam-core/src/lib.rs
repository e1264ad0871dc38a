//! Packcam Core Library
//!
//! This crate provides the domain models, error types, configuration and collaborator
//! traits shared by every packcam component: the scan debouncer, the capture state
//! machine, the clip queue and upload worker pool, and the local fallback store.

pub mod camera;
pub mod config;
pub mod constants;
pub mod delivery;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use camera::{CameraSource, LiveStream, RecordedClip};
pub use config::{CaptureConfig, DeliveryConfig, FallbackConfig, PipelineConfig, WorkerConfig};
pub use delivery::{NotificationCollaborator, UploadCollaborator};
pub use error::{CaptureError, DeliveryError};
pub use hooks::{ClipSink, NoOpConsole, NoOpTone, OperatorConsole, Tone, ToneSignal};
