//! Clip delivery: the pending-clip queue and the upload worker pool that drains it.
//!
//! The queue and the pool are explicit owned values. Whoever mounts the capture screen
//! creates a [`ClipQueue`], hands one clone to the capture machine (as its
//! [`packcam_core::ClipSink`]) and one to the [`UploadWorkerPool`], and shuts the pool
//! down when the screen goes away.

pub mod context;
pub mod delivery;
pub mod pool;
pub mod queue;

pub use context::DeliveryContext;
pub use delivery::{deliver, parse_object_id};
pub use pool::UploadWorkerPool;
pub use queue::{ClaimedClip, ClipQueue, ClipSummary, PoolStatus};
