//! Packcam Infrastructure Library
//!
//! Process-level concerns shared by the binaries: tracing initialisation and the
//! always-on status indicator.

pub mod status;
pub mod telemetry;

pub use status::{run_status_logger, StatusIndicator};
pub use telemetry::{init_telemetry, LogFormat};
