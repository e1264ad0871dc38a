//! Fixed timing and concurrency constants of the capture-and-delivery pipeline.
//!
//! Every value here can be overridden through [`crate::PipelineConfig`]; the constants
//! are the defaults used when no override is present.

/// How long an identical code must persist before it counts as an intentional scan.
pub const STABILIZATION_WINDOW_MS: u64 = 2000;

/// While a session is active, identical reads this close to the last confirmation are dropped.
pub const RESCAN_SUPPRESSION_MS: u64 = 2000;

/// Feedback pause between detection and the start of media capture.
pub const SETTLE_DELAY_MS: u64 = 500;

/// Maximum number of clips uploading at the same time.
pub const MAX_UPLOAD_CONCURRENCY: usize = 2;

/// Safety-net wake-up for the worker pool when no enqueue notification arrives.
pub const WORKER_IDLE_POLL_MS: u64 = 1000;

/// Codes at or below this length are never treated as doubled payloads.
pub const DOUBLED_CODE_MIN_LEN: usize = 8;

/// Shareable link for a stored object; `{id}` is replaced by the durable object id.
pub const DEFAULT_REFERENCE_URL_TEMPLATE: &str = "https://drive.google.com/file/d/{id}/view";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Key under which the remembered fallback folder is persisted.
pub const FALLBACK_HANDLE_KEY: &str = "fallback-folder";
