//! Status indicator
//!
//! Tells the operator at all times how many clips are still queued and how many workers
//! are busy, i.e. whether it is safe to power the device off.

use std::fmt;

use packcam_core::models::CaptureView;
use packcam_worker::PoolStatus;
use tokio::sync::watch;

/// Snapshot rendered as a one-line indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusIndicator {
    pub capture: CaptureView,
    pub pool: PoolStatus,
    pub max_workers: usize,
}

impl StatusIndicator {
    pub fn safe_to_power_off(&self) -> bool {
        self.pool.is_drained() && self.capture != CaptureView::Recording
    }
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] queue {} ({} uploading) | workers {}/{}",
            self.capture,
            self.pool.queue_depth,
            self.pool.uploading,
            self.pool.active_workers,
            self.max_workers
        )?;
        if self.safe_to_power_off() {
            write!(f, " | safe to power off")?;
        }
        Ok(())
    }
}

/// Log the indicator on every change until either feed closes.
pub async fn run_status_logger(
    mut pool: watch::Receiver<PoolStatus>,
    mut capture: watch::Receiver<CaptureView>,
    max_workers: usize,
) {
    loop {
        let indicator = StatusIndicator {
            capture: *capture.borrow_and_update(),
            pool: *pool.borrow_and_update(),
            max_workers,
        };
        tracing::info!(
            queue_depth = indicator.pool.queue_depth,
            active_workers = indicator.pool.active_workers,
            capture = %indicator.capture,
            "{}",
            indicator
        );

        tokio::select! {
            changed = pool.changed() => if changed.is_err() { break },
            changed = capture.changed() => if changed.is_err() { break },
        }
    }
    tracing::debug!("Status logger stopped");
}
