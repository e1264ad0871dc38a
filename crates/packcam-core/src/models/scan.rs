use tokio::time::Instant;

/// A single raw read reported by the barcode decoder. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub raw_code: String,
    pub observed_at: Instant,
}

impl ScanEvent {
    pub fn new(raw_code: impl Into<String>) -> Self {
        Self::at(raw_code, Instant::now())
    }

    pub fn at(raw_code: impl Into<String>, observed_at: Instant) -> Self {
        Self {
            raw_code: raw_code.into(),
            observed_at,
        }
    }
}

/// One intentional scan of a physical item, derived from a stable run of reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedScan {
    pub code: String,
    pub confirmed_at: Instant,
}
