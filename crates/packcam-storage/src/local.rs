use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use packcam_core::FallbackConfig;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{AccessGrant, FallbackError, FallbackResult, FolderAccess, FolderTarget};

/// Local filesystem implementation of the fallback OS surface
///
/// The "chooser" offers one preconfigured folder (or declines when none is configured),
/// permissions are the directory's own, and downloads land in a separate directory with
/// browser-style ` (n)` suffixes instead of overwriting earlier downloads.
#[derive(Clone, Debug)]
pub struct DirectoryFolderAccess {
    offered_folder: Option<PathBuf>,
    download_dir: PathBuf,
}

impl DirectoryFolderAccess {
    /// # Arguments
    /// * `offered_folder` - Folder returned by the chooser; `None` declines every prompt
    /// * `download_dir` - Directory receiving one-shot downloads
    pub fn new(offered_folder: Option<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            offered_folder,
            download_dir: download_dir.into(),
        }
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        Self::new(config.folder.clone(), config.download_dir.clone())
    }

    /// Join a bare filename onto `dir`, refusing anything that could escape it.
    fn file_path(dir: &Path, filename: &str) -> FallbackResult<PathBuf> {
        if filename.is_empty()
            || filename.contains("..")
            || filename.contains('/')
            || filename.contains('\\')
        {
            return Err(FallbackError::InvalidFilename(filename.to_string()));
        }
        Ok(dir.join(filename))
    }

    /// First free path for `filename` in `dir`: `name.ext`, `name (1).ext`, ...
    async fn unique_path(dir: &Path, filename: &str) -> FallbackResult<PathBuf> {
        let candidate = Self::file_path(dir, filename)?;
        if !fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }

        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        let mut n = 1;
        loop {
            let name = match ext {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = dir.join(name);
            if !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    async fn write_bytes(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl FolderAccess for DirectoryFolderAccess {
    async fn choose_folder(&self) -> FallbackResult<Option<FolderTarget>> {
        Ok(self.offered_folder.clone().map(FolderTarget::new))
    }

    async fn query_permission(&self, target: &FolderTarget) -> FallbackResult<AccessGrant> {
        match fs::metadata(target.path()).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => Ok(AccessGrant::Granted),
            Ok(_) => Ok(AccessGrant::Denied),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AccessGrant::Prompt),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(AccessGrant::Denied),
            Err(e) => Err(FallbackError::PermissionCheckFailed(format!(
                "{}: {}",
                target, e
            ))),
        }
    }

    async fn request_permission(&self, target: &FolderTarget) -> FallbackResult<AccessGrant> {
        if self.query_permission(target).await? == AccessGrant::Prompt {
            if let Err(e) = fs::create_dir_all(target.path()).await {
                tracing::debug!(folder = %target, error = %e, "Could not create fallback folder");
                return Ok(AccessGrant::Denied);
            }
        }
        self.query_permission(target).await
    }

    async fn write_file(
        &self,
        target: &FolderTarget,
        filename: &str,
        data: Bytes,
    ) -> FallbackResult<PathBuf> {
        let path = Self::file_path(target.path(), filename)?;
        let start = std::time::Instant::now();

        Self::write_bytes(&path, &data).await.map_err(|e| {
            FallbackError::WriteFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Clip written to fallback folder"
        );
        Ok(path)
    }

    async fn download(&self, filename: &str, data: Bytes) -> FallbackResult<PathBuf> {
        fs::create_dir_all(&self.download_dir).await.map_err(|e| {
            FallbackError::DownloadFailed(format!(
                "Failed to create download directory {}: {}",
                self.download_dir.display(),
                e
            ))
        })?;

        let path = Self::unique_path(&self.download_dir, filename).await?;
        Self::write_bytes(&path, &data).await.map_err(|e| {
            FallbackError::DownloadFailed(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}
