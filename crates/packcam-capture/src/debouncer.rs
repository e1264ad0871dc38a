//! Scan debouncer: one confirmed scan per physical item.
//!
//! Decoders report the same barcode many times per second while an item is held in
//! front of the camera. The debouncer opens a stabilization window on the first read of
//! a code and confirms the code when the window elapses without a different code being
//! read. Repeated reads of the pending code neither confirm early nor restart the window.

use std::time::Duration;

use packcam_core::constants::DOUBLED_CODE_MIN_LEN;
use packcam_core::models::{ConfirmedScan, MachineState, ScanEvent};
use packcam_core::CaptureConfig;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

/// Result of feeding one read to the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The code is inside its stabilization window.
    Pending,
    /// The read was dropped (empty, or a re-read of the active session's code).
    Suppressed,
}

#[derive(Debug)]
struct Candidate {
    code: String,
    first_seen_at: Instant,
    last_seen_at: Instant,
    reads: u32,
}

#[derive(Debug)]
pub struct ScanDebouncer {
    window: Duration,
    suppression: Duration,
    candidate: Option<Candidate>,
    last_confirmed: Option<(String, Instant)>,
    session_active: bool,
    /// Session state reported when the last scan was confirmed, kept until the machine
    /// reports a different one. An idle hand-off already counts as an open session.
    handoff_from: Option<bool>,
}

impl ScanDebouncer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            window: config.stabilization_window,
            suppression: config.rescan_suppression,
            candidate: None,
            last_confirmed: None,
            session_active: false,
            handoff_from: None,
        }
    }

    /// Tell the debouncer whether a capture session currently exists.
    pub fn set_session_active(&mut self, active: bool) {
        if self.handoff_from.is_some_and(|from| from != active) {
            self.handoff_from = None;
        }
        self.session_active = active;
    }

    /// Whether re-scan suppression applies. A scan confirmed while idle opens a session
    /// before the machine has published it.
    fn suppressing(&self) -> bool {
        self.session_active || self.handoff_from == Some(false)
    }

    pub fn observe(&mut self, raw_code: &str, now: Instant) -> Observation {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Observation::Suppressed;
        }

        if self.suppressing() {
            if let Some((last, confirmed_at)) = &self.last_confirmed {
                if *last == code && now.saturating_duration_since(*confirmed_at) < self.suppression
                {
                    tracing::trace!(code = %code, "Re-read of active session code suppressed");
                    if self.candidate.as_ref().is_some_and(|c| c.code == code) {
                        self.candidate = None;
                    }
                    return Observation::Suppressed;
                }
            }
        }

        match self.candidate.as_mut() {
            Some(candidate) if candidate.code == code => {
                candidate.last_seen_at = now;
                candidate.reads += 1;
            }
            _ => {
                if let Some(previous) = &self.candidate {
                    tracing::debug!(
                        previous = %previous.code,
                        code = %code,
                        "Different code read, stabilization window restarted"
                    );
                }
                self.candidate = Some(Candidate {
                    code,
                    first_seen_at: now,
                    last_seen_at: now,
                    reads: 1,
                });
            }
        }

        Observation::Pending
    }

    /// Instant at which the pending code confirms, if any code is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.candidate
            .as_ref()
            .map(|candidate| candidate.first_seen_at + self.window)
    }

    pub fn is_stabilizing(&self) -> bool {
        self.candidate.is_some()
    }

    /// Confirm the pending code if its window has elapsed by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<ConfirmedScan> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        let candidate = self.candidate.take()?;
        tracing::info!(
            code = %candidate.code,
            reads = candidate.reads,
            held_ms = candidate
                .last_seen_at
                .saturating_duration_since(candidate.first_seen_at)
                .as_millis() as u64,
            "Scan confirmed"
        );
        self.last_confirmed = Some((candidate.code.clone(), deadline));
        self.handoff_from = Some(self.session_active);

        Some(ConfirmedScan {
            code: candidate.code,
            confirmed_at: deadline,
        })
    }
}

/// Trim a raw read and collapse payloads the decoder emitted twice back-to-back.
///
/// Only even-length codes longer than [`DOUBLED_CODE_MIN_LEN`] are candidates, so short
/// codes such as `"ABAB"` are left untouched.
pub fn normalize_code(raw_code: &str) -> String {
    let code = raw_code.trim();
    let len = code.len();
    if len > DOUBLED_CODE_MIN_LEN && len % 2 == 0 && code.is_char_boundary(len / 2) {
        let (first, second) = code.split_at(len / 2);
        if first == second {
            return first.to_string();
        }
    }
    code.to_string()
}

/// Drive a debouncer from decoder events until the event channel closes.
///
/// `machine_state` is the capture machine's published state; any non-idle state counts
/// as an active session. `stabilizing` receives the pending-window projection.
pub async fn run_debouncer(
    mut debouncer: ScanDebouncer,
    mut events: mpsc::Receiver<ScanEvent>,
    confirmed: mpsc::Sender<ConfirmedScan>,
    machine_state: watch::Receiver<MachineState>,
    stabilizing: watch::Sender<bool>,
) {
    tracing::debug!("Scan debouncer started");

    loop {
        let deadline = debouncer.deadline();
        let wake_at = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                debouncer.set_session_active(*machine_state.borrow() != MachineState::Idle);
                debouncer.observe(&event.raw_code, event.observed_at);
            }
            _ = sleep_until(wake_at), if deadline.is_some() => {
                if let Some(scan) = debouncer.poll(Instant::now()) {
                    if confirmed.send(scan).await.is_err() {
                        tracing::debug!("Confirmed scan receiver dropped");
                        break;
                    }
                }
            }
        }

        stabilizing.send_replace(debouncer.is_stabilizing());
    }

    stabilizing.send_replace(false);
    tracing::debug!("Scan debouncer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> ScanDebouncer {
        ScanDebouncer::new(&CaptureConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn repeated_reads_confirm_once_at_window_end() {
        let mut d = debouncer();
        let t0 = Instant::now();

        for i in 0..40 {
            assert_eq!(d.observe("A1", t0 + ms(i * 40)), Observation::Pending);
            assert!(d.poll(t0 + ms(i * 40)).is_none());
        }

        assert!(d.poll(t0 + ms(1999)).is_none());
        let scan = d.poll(t0 + ms(2000)).expect("confirmed");
        assert_eq!(scan.code, "A1");
        assert_eq!(scan.confirmed_at, t0 + ms(2000));
        assert!(d.poll(t0 + ms(5000)).is_none());
    }

    #[test]
    fn different_code_restarts_window() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("A1", t0);
        d.observe("B2", t0 + ms(1500));
        assert!(d.poll(t0 + ms(2000)).is_none());
        assert_eq!(d.deadline(), Some(t0 + ms(3500)));

        let scan = d.poll(t0 + ms(3500)).expect("confirmed");
        assert_eq!(scan.code, "B2");
    }

    #[test]
    fn doubled_payload_is_collapsed() {
        assert_eq!(normalize_code("ASEN001ASEN001"), "ASEN001");
        assert_eq!(normalize_code("ASEN001"), "ASEN001");
        assert_eq!(normalize_code("ABCDABCD"), "ABCDABCD");
        assert_eq!(normalize_code("ABCDEABCDF"), "ABCDEABCDF");
        assert_eq!(normalize_code("  A1  "), "A1");
    }

    #[test]
    fn doubled_and_single_reads_share_a_window() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("ASEN001ASEN001", t0);
        d.observe("ASEN001", t0 + ms(300));
        let scan = d.poll(t0 + ms(2000)).expect("confirmed");
        assert_eq!(scan.code, "ASEN001");
    }

    #[test]
    fn rereads_of_active_session_code_are_suppressed() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("A1", t0);
        d.poll(t0 + ms(2000)).expect("confirmed");
        d.set_session_active(true);

        assert_eq!(d.observe("A1", t0 + ms(2500)), Observation::Suppressed);
        assert!(!d.is_stabilizing());

        // a different code is never suppressed
        assert_eq!(d.observe("B2", t0 + ms(2600)), Observation::Pending);
    }

    #[test]
    fn suppression_expires_after_window() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("A1", t0);
        d.poll(t0 + ms(2000)).expect("confirmed");
        d.set_session_active(true);

        assert_eq!(d.observe("A1", t0 + ms(4000)), Observation::Pending);
        let stop = d.poll(t0 + ms(6000)).expect("second confirmation");
        assert_eq!(stop.code, "A1");
    }

    #[test]
    fn no_suppression_after_closing_scan() {
        let mut d = debouncer();
        let t0 = Instant::now();
        d.set_session_active(true);

        d.observe("A1", t0);
        d.poll(t0 + ms(2000)).expect("closing scan confirmed");
        assert_eq!(d.observe("A1", t0 + ms(2050)), Observation::Suppressed);

        d.set_session_active(false);
        assert_eq!(d.observe("A1", t0 + ms(2100)), Observation::Pending);
    }

    #[test]
    fn reads_right_after_opening_scan_are_suppressed() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("A1", t0);
        d.poll(t0 + ms(2000)).expect("confirmed");

        // machine still reports idle while it acquires the camera
        d.set_session_active(false);
        assert_eq!(d.observe("A1", t0 + ms(2050)), Observation::Suppressed);
        assert!(!d.is_stabilizing());

        d.set_session_active(true);
        for i in 1..30 {
            assert_eq!(d.observe("A1", t0 + ms(2050 + i * 50)), Observation::Suppressed);
        }
        assert!(d.deadline().is_none());
        assert!(d.poll(t0 + ms(6000)).is_none());
    }

    #[test]
    fn suppressed_read_drops_pending_candidate() {
        let mut d = debouncer();
        let t0 = Instant::now();

        d.observe("A1", t0);
        d.poll(t0 + ms(2000)).expect("confirmed");
        d.set_session_active(true);
        d.set_session_active(false);

        // session closed: a fresh candidate opens, then the machine reopens
        assert_eq!(d.observe("A1", t0 + ms(2100)), Observation::Pending);
        d.set_session_active(true);
        assert_eq!(d.observe("A1", t0 + ms(2200)), Observation::Suppressed);
        assert!(d.deadline().is_none());
    }

    #[test]
    fn empty_reads_are_ignored() {
        let mut d = debouncer();
        assert_eq!(d.observe("   ", Instant::now()), Observation::Suppressed);
        assert!(d.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_emits_single_confirmation_on_timer() {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (confirmed_tx, mut confirmed_rx) = mpsc::channel(8);
        let (_state_tx, state_rx) = watch::channel(MachineState::Idle);
        let (stabilizing_tx, stabilizing_rx) = watch::channel(false);

        let handle = tokio::spawn(run_debouncer(
            debouncer(),
            event_rx,
            confirmed_tx,
            state_rx,
            stabilizing_tx,
        ));

        let t0 = Instant::now();
        for _ in 0..25 {
            event_tx.send(ScanEvent::new("A1")).await.unwrap();
            tokio::time::sleep(ms(50)).await;
        }
        assert!(*stabilizing_rx.borrow());

        let scan = confirmed_rx.recv().await.expect("confirmation");
        assert_eq!(scan.code, "A1");
        assert_eq!(scan.confirmed_at, t0 + ms(2000));

        drop(event_tx);
        handle.await.unwrap();
        assert!(confirmed_rx.recv().await.is_none());
        assert!(!*stabilizing_rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn held_item_confirms_once_while_machine_catches_up() {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (confirmed_tx, mut confirmed_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(MachineState::Idle);
        let (stabilizing_tx, _stabilizing_rx) = watch::channel(false);

        let handle = tokio::spawn(run_debouncer(
            debouncer(),
            event_rx,
            confirmed_tx,
            state_rx,
            stabilizing_tx,
        ));

        // held for 3.5 s; the machine needs 300 ms to leave idle after the hand-off
        let mut confirmations = 0;
        let mut opened_at = None;
        for i in 0..70 {
            event_tx.send(ScanEvent::new("A1")).await.unwrap();
            tokio::time::sleep(ms(50)).await;

            while confirmed_rx.try_recv().is_ok() {
                confirmations += 1;
                opened_at.get_or_insert(i);
            }
            if opened_at.is_some_and(|at| i == at + 6) {
                state_tx.send_replace(MachineState::Recording);
            }
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        while confirmed_rx.try_recv().is_ok() {
            confirmations += 1;
        }
        assert_eq!(confirmations, 1);

        drop(event_tx);
        handle.await.unwrap();
    }
}
