//! Pipeline orchestration: drives all stages for one item and owns its
//! status transitions.
//!
//! `run` executes the stages strictly sequentially, converts every stage
//! error into a terminal `failed` write, and persists the terminal result
//! as a single atomic store update. An item is never left in `processing`
//! because of a fault inside the pipeline.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::caption::{CaptionInput, Captioner};
use crate::config::Config;
use crate::error::PipelineResult;
use crate::storage::FileStore;
use crate::store::RecordStore;
use crate::types::{ImageMetadata, TerminalOutcome};

use super::decode::{format_to_string, ImageDecoder};
use super::metadata::MetadataExtractor;
use super::thumbnail::ThumbnailGenerator;

/// Drives the full processing pipeline for uploaded items.
pub struct PipelineRunner {
    decoder: ImageDecoder,
    thumbnails: ThumbnailGenerator,
    captioner: Arc<dyn Captioner>,
    store: Arc<dyn RecordStore>,
    files: Arc<FileStore>,
    caption_timeout: Duration,
}

impl PipelineRunner {
    /// Create a runner wired to the given store, file storage, and caption
    /// backend.
    pub fn new(
        config: &Config,
        files: Arc<FileStore>,
        store: Arc<dyn RecordStore>,
        captioner: Arc<dyn Captioner>,
    ) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            thumbnails: ThumbnailGenerator::new(files.clone(), config.thumbnail.clone()),
            captioner,
            store,
            files,
            caption_timeout: Duration::from_millis(config.limits.caption_timeout_ms),
        }
    }

    /// Execute the full pipeline for one item, exactly once.
    ///
    /// Called after the item is persisted in `processing` state. Whatever
    /// happens inside the stages, this method ends with one terminal store
    /// write; only a store failure itself is beyond recovery here, and that
    /// is logged for the external sweep to reconcile.
    pub async fn run(&self, item_id: &str, source_path: &Path, original_name: &str) {
        let started = std::time::Instant::now();
        tracing::info!(item_id, original_name, "processing image");

        let outcome = match self.execute(item_id, source_path).await {
            Ok(metadata) => {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::info!(item_id, elapsed_s = %format!("{elapsed:.2}"), "image processed");
                TerminalOutcome::Success {
                    metadata,
                    processing_time_seconds: elapsed,
                }
            }
            Err(e) => {
                tracing::error!(item_id, error = %e, "pipeline failed");
                // No partial artifact may outlive a non-success record
                self.files.remove_thumbnails(item_id);
                TerminalOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        if let Err(e) = self.store.update_terminal(item_id, outcome, Utc::now()).await {
            tracing::error!(item_id, error = %e, "failed to persist terminal state");
        }
    }

    /// The fallible stage sequence. Any `Err` becomes a terminal `failed`.
    async fn execute(&self, item_id: &str, source_path: &Path) -> PipelineResult<ImageMetadata> {
        // Decode
        let decoded = self.decoder.decode(source_path).await?;
        tracing::debug!(
            item_id,
            width = decoded.width,
            height = decoded.height,
            format = %format_to_string(decoded.format),
            "decoded"
        );

        // Extract metadata; EXIF is best-effort inside the extractor
        let exif = MetadataExtractor::extract(source_path);

        // Generate both thumbnail presets; not best-effort
        self.thumbnails.generate_all(item_id, &decoded.image)?;

        // Caption, after thumbnails are durable; never fatal
        let format = format_to_string(decoded.format);
        let caption = self.caption(item_id, source_path, &format).await;

        Ok(ImageMetadata {
            width: decoded.width,
            height: decoded.height,
            format,
            size_bytes: decoded.file_size,
            exif,
            caption,
        })
    }

    /// Best-effort caption stage: every failure path — read error, backend
    /// error, timeout — collapses to `None` with a warning.
    async fn caption(&self, item_id: &str, source_path: &Path, format: &str) -> Option<String> {
        let bytes = match tokio::fs::read(source_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "caption skipped: cannot read source");
                return None;
            }
        };
        let input = CaptionInput::from_bytes(&bytes, format);

        match tokio::time::timeout(self.caption_timeout, self.captioner.generate(&input)).await {
            Ok(Ok(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    tracing::debug!(item_id, backend = self.captioner.name(), "caption generated");
                    Some(text)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(item_id, backend = self.captioner.name(), error = %e, "captioning failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    item_id,
                    backend = self.captioner.name(),
                    timeout_ms = self.caption_timeout.as_millis() as u64,
                    "captioning timed out"
                );
                None
            }
        }
    }
}
