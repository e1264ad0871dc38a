//! Packcam Capture Library
//!
//! Turns raw decoder reads into confirmed scans ([`ScanDebouncer`]) and drives the
//! recording lifecycle from those confirmations ([`CaptureMachine`]). The two halves only
//! meet through channels: the debouncer never touches capture state, it only observes
//! the machine's published state to decide whether re-scan suppression applies.

pub mod debouncer;
pub mod machine;
pub mod tone;

pub use debouncer::{normalize_code, run_debouncer, Observation, ScanDebouncer};
pub use machine::{CaptureControl, CaptureEvent, CaptureMachine};
pub use tone::{LogTone, TerminalBell};
