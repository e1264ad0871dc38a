//! Remembered folder handles and their stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::traits::{AccessGrant, FallbackError, FallbackResult, FolderTarget, HandleStore};

/// A previously chosen write target plus the grant last obtained for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackHandle {
    pub target: FolderTarget,
    pub grant: AccessGrant,
    pub chosen_at: DateTime<Utc>,
    pub verified_at: DateTime<Utc>,
}

impl FallbackHandle {
    /// Handle for a folder the operator just chose and granted.
    pub fn granted(target: FolderTarget) -> Self {
        let now = Utc::now();
        Self {
            target,
            grant: AccessGrant::Granted,
            chosen_at: now,
            verified_at: now,
        }
    }

    pub fn record_grant(&mut self, grant: AccessGrant) {
        self.grant = grant;
        if grant == AccessGrant::Granted {
            self.verified_at = Utc::now();
        }
    }
}

/// Handle store backed by a single JSON file.
///
/// The whole map is rewritten on every change through a temporary file and a rename, so
/// a crash never leaves a half-written store behind.
pub struct JsonFileHandleStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHandleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> FallbackResult<HashMap<String, FallbackHandle>> {
        match fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(HashMap::new()),
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(FallbackError::HandleStore(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn persist(&self, entries: &HashMap<String, FallbackHandle>) -> FallbackResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            FallbackError::HandleStore(format!(
                "Failed to create {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            FallbackError::HandleStore(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl HandleStore for JsonFileHandleStore {
    async fn get(&self, key: &str) -> FallbackResult<Option<FallbackHandle>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn put(&self, key: &str, handle: &FallbackHandle) -> FallbackResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), handle.clone());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> FallbackResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}

/// In-memory handle store; nothing survives the process.
#[derive(Default)]
pub struct MemoryHandleStore {
    entries: Mutex<HashMap<String, FallbackHandle>>,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandleStore for MemoryHandleStore {
    async fn get(&self, key: &str) -> FallbackResult<Option<FallbackHandle>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, handle: &FallbackHandle) -> FallbackResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), handle.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> FallbackResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
