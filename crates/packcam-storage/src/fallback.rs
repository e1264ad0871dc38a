//! Local fallback store.
//!
//! `save` never fails. It either writes the clip into the remembered folder or falls back
//! to a one-shot download, reporting which happened.
//!
//! - No remembered folder: prompt once. A declined prompt downloads this clip and
//!   remembers nothing.
//! - Remembered folder: re-verify its grant before each write. A denied or failing check
//!   downloads the clip but keeps the handle, so the next save asks again instead of
//!   forcing a new choice.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use packcam_core::constants::FALLBACK_HANDLE_KEY;
use tokio::sync::Mutex;

use crate::handle::FallbackHandle;
use crate::traits::{AccessGrant, FolderAccess, FolderTarget, HandleStore};

/// Why a clip did not land in the remembered folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// The operator declined the first-time folder prompt.
    PromptDeclined,
    /// The remembered folder's grant was denied or could not be checked.
    AccessDenied,
    /// The folder was usable but the write failed.
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        path: PathBuf,
    },
    /// The clip went to a one-shot download instead. `download` is `None` only when the
    /// download itself failed too.
    Declined {
        reason: DeclineReason,
        download: Option<PathBuf>,
    },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

enum Resolution {
    Target(FolderTarget),
    Declined(DeclineReason),
}

pub struct LocalFallbackStore {
    access: Arc<dyn FolderAccess>,
    handles: Arc<dyn HandleStore>,
    /// Serializes handle resolution; writes run outside it.
    resolve_lock: Mutex<()>,
}

impl LocalFallbackStore {
    pub fn new(access: Arc<dyn FolderAccess>, handles: Arc<dyn HandleStore>) -> Self {
        Self {
            access,
            handles,
            resolve_lock: Mutex::new(()),
        }
    }

    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn save(&self, data: Bytes, filename: &str) -> SaveOutcome {
        let target = match self.resolve_target().await {
            Resolution::Target(target) => target,
            Resolution::Declined(reason) => return self.download(data, filename, reason).await,
        };

        match self.access.write_file(&target, filename, data.clone()).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Local copy saved");
                SaveOutcome::Saved { path }
            }
            Err(e) => {
                tracing::warn!(folder = %target, error = %e, "Local copy write failed");
                self.download(data, filename, DeclineReason::WriteFailed)
                    .await
            }
        }
    }

    /// Currently remembered handle, if any.
    pub async fn remembered(&self) -> Option<FallbackHandle> {
        match self.handles.get(FALLBACK_HANDLE_KEY).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read fallback handle");
                None
            }
        }
    }

    /// Drop the remembered folder so the next save prompts again.
    pub async fn forget(&self) {
        let _guard = self.resolve_lock.lock().await;
        if let Err(e) = self.handles.remove(FALLBACK_HANDLE_KEY).await {
            tracing::warn!(error = %e, "Failed to forget fallback handle");
        }
    }

    async fn resolve_target(&self) -> Resolution {
        let _guard = self.resolve_lock.lock().await;

        let stored = match self.handles.get(FALLBACK_HANDLE_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Fallback handle store unreadable");
                return Resolution::Declined(DeclineReason::AccessDenied);
            }
        };

        match stored {
            Some(handle) => self.verify(handle).await,
            None => self.prompt().await,
        }
    }

    async fn verify(&self, mut handle: FallbackHandle) -> Resolution {
        let grant = match self.access.query_permission(&handle.target).await {
            Ok(AccessGrant::Prompt) => self
                .access
                .request_permission(&handle.target)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(folder = %handle.target, error = %e, "Permission request failed");
                    AccessGrant::Denied
                }),
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(folder = %handle.target, error = %e, "Permission check failed");
                AccessGrant::Denied
            }
        };

        handle.record_grant(grant);
        if let Err(e) = self.handles.put(FALLBACK_HANDLE_KEY, &handle).await {
            tracing::warn!(error = %e, "Failed to update fallback handle");
        }

        if grant == AccessGrant::Granted {
            Resolution::Target(handle.target)
        } else {
            tracing::warn!(folder = %handle.target, grant = ?grant, "Fallback folder not accessible");
            Resolution::Declined(DeclineReason::AccessDenied)
        }
    }

    async fn prompt(&self) -> Resolution {
        let target = match self.access.choose_folder().await {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::info!("Fallback folder prompt declined");
                return Resolution::Declined(DeclineReason::PromptDeclined);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Fallback folder chooser failed");
                return Resolution::Declined(DeclineReason::PromptDeclined);
            }
        };

        let grant = self
            .access
            .request_permission(&target)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(folder = %target, error = %e, "Permission request failed");
                AccessGrant::Denied
            });
        if grant != AccessGrant::Granted {
            tracing::warn!(folder = %target, grant = ?grant, "Chosen folder not granted");
            return Resolution::Declined(DeclineReason::AccessDenied);
        }

        let handle = FallbackHandle::granted(target.clone());
        if let Err(e) = self.handles.put(FALLBACK_HANDLE_KEY, &handle).await {
            tracing::warn!(error = %e, "Failed to remember fallback folder");
        } else {
            tracing::info!(folder = %target, "Fallback folder remembered");
        }
        Resolution::Target(target)
    }

    async fn download(&self, data: Bytes, filename: &str, reason: DeclineReason) -> SaveOutcome {
        let download = match self.access.download(filename, data).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), reason = ?reason, "Clip offered as download");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, reason = ?reason, "Download fallback failed");
                None
            }
        };
        SaveOutcome::Declined { reason, download }
    }
}
