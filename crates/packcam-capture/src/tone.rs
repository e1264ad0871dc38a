use std::io::Write;

use packcam_core::{Tone, ToneSignal};

/// Records every tone as a debug event. Used when no speaker is attached.
pub struct LogTone;

impl ToneSignal for LogTone {
    fn signal(&self, tone: Tone) {
        tracing::debug!(tone = ?tone, "Feedback tone");
    }
}

/// Rings the terminal bell: once for detection and start, twice for stop, three times
/// for failures.
pub struct TerminalBell;

impl TerminalBell {
    fn rings(tone: Tone) -> usize {
        match tone {
            Tone::Detected | Tone::RecordingStarted => 1,
            Tone::RecordingStopped => 2,
            Tone::Failure => 3,
        }
    }
}

impl ToneSignal for TerminalBell {
    fn signal(&self, tone: Tone) {
        let bells = "\x07".repeat(Self::rings(tone));
        let mut stderr = std::io::stderr();
        // A missing terminal is not worth reporting.
        let _ = stderr.write_all(bells.as_bytes());
        let _ = stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_ring_loudest() {
        assert_eq!(TerminalBell::rings(Tone::Detected), 1);
        assert_eq!(TerminalBell::rings(Tone::RecordingStopped), 2);
        assert_eq!(TerminalBell::rings(Tone::Failure), 3);
    }
}
