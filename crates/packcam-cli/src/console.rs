use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use packcam_core::OperatorConsole;
use tokio::sync::{mpsc, Mutex};

/// Operator console on the terminal.
///
/// Ambiguous-close questions are answered by the next stdin line (`y`/`yes` confirms,
/// anything else keeps recording), unless `assume_yes` confirms them up front.
pub struct TerminalConsole {
    assume_yes: bool,
    waiting: AtomicBool,
    answer_tx: mpsc::Sender<bool>,
    answer_rx: Mutex<mpsc::Receiver<bool>>,
}

impl TerminalConsole {
    pub fn new(assume_yes: bool) -> Self {
        let (answer_tx, answer_rx) = mpsc::channel(1);
        Self {
            assume_yes,
            waiting: AtomicBool::new(false),
            answer_tx,
            answer_rx: Mutex::new(answer_rx),
        }
    }

    pub fn awaiting_answer(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Route an operator line to the pending question. Returns false when none is pending.
    pub fn answer(&self, line: &str) -> bool {
        if !self.awaiting_answer() {
            return false;
        }
        let confirmed = matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes");
        let _ = self.answer_tx.try_send(confirmed);
        true
    }
}

#[async_trait]
impl OperatorConsole for TerminalConsole {
    async fn confirm_ambiguous_stop(&self, session_code: &str, scanned_code: &str) -> bool {
        if self.assume_yes {
            tracing::info!(session_code, scanned_code, "Ambiguous close confirmed automatically");
            return true;
        }

        let mut answers = self.answer_rx.lock().await;
        // drop answers typed while no question was pending
        while answers.try_recv().is_ok() {}

        println!(
            "Recording {} but scanned {}. Stop the recording? [y/N]",
            session_code, scanned_code
        );
        self.waiting.store(true, Ordering::SeqCst);
        let confirmed = answers.recv().await.unwrap_or(false);
        self.waiting.store(false, Ordering::SeqCst);
        confirmed
    }

    fn delivery_failed(&self, shipment_code: &str, error: &str) {
        println!("\x07!! Delivery failed for {}: {}", shipment_code, error);
    }
}
