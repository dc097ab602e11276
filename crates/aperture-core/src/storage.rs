//! Durable file storage for uploaded sources and generated thumbnails.
//!
//! All paths derive from explicitly constructed roots; nothing reads
//! ambient process state. Each item's files are written once, by the single
//! pipeline run for that item, and never mutated afterward.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::types::ThumbnailPreset;

/// Filesystem layout for one Aperture deployment.
#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    thumbnail_dir: PathBuf,
}

impl FileStore {
    /// Open a file store rooted at the given directories, creating them
    /// if needed.
    pub fn open(upload_dir: PathBuf, thumbnail_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&upload_dir)?;
        std::fs::create_dir_all(&thumbnail_dir)?;
        Ok(Self {
            upload_dir,
            thumbnail_dir,
        })
    }

    /// Open a file store at the configured data directory.
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        Self::open(config.upload_dir(), config.thumbnail_dir())
    }

    /// Path of an item's stored source file.
    pub fn upload_path(&self, id: &str, ext: &str) -> PathBuf {
        self.upload_dir.join(format!("{id}.{ext}"))
    }

    /// Persist uploaded bytes and return the stored path.
    pub async fn save_upload(&self, id: &str, ext: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.upload_path(id, ext);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove a stored source file (used when upload-time validation
    /// rejects the content after the bytes were saved).
    pub async fn remove_upload(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove rejected upload");
        }
    }

    /// Path of an item's thumbnail for the given preset.
    pub fn thumbnail_path(&self, id: &str, preset: ThumbnailPreset) -> PathBuf {
        self.thumbnail_dir.join(format!("{id}_{preset}.jpg"))
    }

    /// Read an item's thumbnail bytes.
    pub async fn read_thumbnail(
        &self,
        id: &str,
        preset: ThumbnailPreset,
    ) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.thumbnail_path(id, preset)).await
    }

    /// Best-effort removal of every thumbnail written for an item.
    ///
    /// Called when a pipeline stage fails after thumbnails may have been
    /// written, so no partial artifact outlives a non-`success` record.
    pub fn remove_thumbnails(&self, id: &str) {
        for preset in ThumbnailPreset::ALL {
            let path = self.thumbnail_path(id, preset);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "removed orphaned thumbnail")
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove thumbnail")
                }
            }
        }
    }
}
