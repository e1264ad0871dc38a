//! Fallback store abstraction traits
//!
//! [`FolderAccess`] is the operating-system surface: a folder chooser, a permission
//! check on a chosen folder, a create-or-overwrite write and a one-shot download.
//! [`HandleStore`] persists the remembered folder between runs.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handle::FallbackHandle;

/// Fallback store errors
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Folder chooser failed: {0}")]
    ChooserFailed(String),

    #[error("Permission check failed: {0}")]
    PermissionCheckFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Handle store error: {0}")]
    HandleStore(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for fallback store operations
pub type FallbackResult<T> = Result<T, FallbackError>;

/// Opaque reference to a chosen write target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderTarget(PathBuf);

impl FolderTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for FolderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// State of the access grant on a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessGrant {
    Granted,
    /// Not decided yet; asking may grant it.
    Prompt,
    Denied,
}

#[async_trait]
pub trait FolderAccess: Send + Sync {
    /// Ask the operator to pick a folder. `Ok(None)` means the prompt was declined.
    async fn choose_folder(&self) -> FallbackResult<Option<FolderTarget>>;

    /// Current grant on `target`, without prompting.
    async fn query_permission(&self, target: &FolderTarget) -> FallbackResult<AccessGrant>;

    /// Ask for write access to `target`.
    async fn request_permission(&self, target: &FolderTarget) -> FallbackResult<AccessGrant>;

    /// Create or overwrite `filename` inside `target`.
    async fn write_file(
        &self,
        target: &FolderTarget,
        filename: &str,
        data: Bytes,
    ) -> FallbackResult<PathBuf>;

    /// Hand the data to the operator as a one-shot download named `filename`.
    async fn download(&self, filename: &str, data: Bytes) -> FallbackResult<PathBuf>;
}

/// Key-value persistence for remembered handles
#[async_trait]
pub trait HandleStore: Send + Sync {
    async fn get(&self, key: &str) -> FallbackResult<Option<FallbackHandle>>;

    async fn put(&self, key: &str, handle: &FallbackHandle) -> FallbackResult<()>;

    async fn remove(&self, key: &str) -> FallbackResult<()>;
}
