pub mod capture;
pub mod clip;
pub mod delivery;
pub mod scan;

pub use capture::{CaptureSession, CaptureView, MachineState};
pub use clip::{clip_filename, extension_for, ClipItem, ClipStatus};
pub use delivery::{
    DeliveryNotice, DeliveryOutcome, DeliveryStep, ReferenceUrlTemplate, StoredObject,
    TransferResponse, UploadTarget,
};
pub use scan::{ConfirmedScan, ScanEvent};
