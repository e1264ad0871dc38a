//! Packcam Storage Library
//!
//! Best-effort local copies of finished clips. A clip is written into a folder the
//! operator chose once; the choice is remembered as a [`FallbackHandle`] and its access
//! grant is re-verified before every write. Whenever the folder cannot be used the clip
//! is handed to a one-shot download instead, so a save never fails outright.
//!
//! # Handle persistence
//!
//! Handles live in a [`HandleStore`], an abstract key-value store. The remembered folder
//! is stored under [`packcam_core::constants::FALLBACK_HANDLE_KEY`].

pub mod fallback;
pub mod handle;
pub mod local;
pub mod mirror;
pub mod traits;

// Re-export commonly used types
pub use fallback::{DeclineReason, LocalFallbackStore, SaveOutcome};
pub use handle::{FallbackHandle, JsonFileHandleStore, MemoryHandleStore};
pub use local::DirectoryFolderAccess;
pub use mirror::MirroringSink;
pub use traits::{
    AccessGrant, FallbackError, FallbackResult, FolderAccess, FolderTarget, HandleStore,
};
