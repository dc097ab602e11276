//! Service facade: the operations behind the HTTP surface.
//!
//! The upload path persists the `processing` record and schedules the
//! pipeline as one logical action, then returns immediately; readers go
//! through the record store and are gated on item status. Processing
//! failures are data (`status: failed`), never transport errors.

use std::sync::Arc;
use uuid::Uuid;

use crate::caption::Captioner;
use crate::config::Config;
use crate::error::ServiceError;
use crate::pipeline::{PipelineRunner, Validator};
use crate::stats::{self, StatsSummary};
use crate::storage::FileStore;
use crate::store::RecordStore;
use crate::types::{ImageRecord, ImageResponse, ImageStatus, ThumbnailPreset, UploadReceipt};

/// Error text persisted and returned for upload-time rejections.
const INVALID_FORMAT: &str = "invalid file format";

/// The operations exposed to API callers.
pub struct ImageService {
    store: Arc<dyn RecordStore>,
    files: Arc<FileStore>,
    runner: Arc<PipelineRunner>,
    validator: Validator,
    base_url: String,
}

impl ImageService {
    /// Wire a service from its collaborators.
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        files: Arc<FileStore>,
        captioner: Arc<dyn Captioner>,
    ) -> Self {
        let runner = Arc::new(PipelineRunner::new(
            config,
            files.clone(),
            store.clone(),
            captioner,
        ));
        Self {
            store,
            files,
            runner,
            validator: Validator::new(config.limits.clone()),
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Accept an upload: validate, persist the record, and schedule the
    /// pipeline run.
    ///
    /// Returns as soon as the `processing` record is durable; the pipeline
    /// runs out-of-band. Invalid uploads are persisted directly as terminal
    /// `failed` records and never enter the pipeline.
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ServiceError> {
        let id = Uuid::new_v4().to_string();

        let Some(ext) = Validator::allowed_extension(original_name) else {
            tracing::warn!(original_name, "upload rejected: disallowed extension");
            return self.reject(id, original_name).await;
        };

        let path = self.files.save_upload(&id, &ext, &bytes).await?;

        // Validation runs on the actually-saved bytes, never on the claimed
        // extension alone. The decode is CPU-bound, so it leaves the async pool.
        let validator = self.validator.clone();
        let check_path = path.clone();
        let check = tokio::task::spawn_blocking(move || validator.validate(&check_path))
            .await
            .map_err(|e| ServiceError::Internal(format!("validation task failed: {e}")))?;

        if let Err(e) = check {
            tracing::warn!(original_name, error = %e, "upload rejected: invalid content");
            self.files.remove_upload(&path).await;
            return self.reject(id, original_name).await;
        }

        self.store
            .insert(ImageRecord::new(id.clone(), original_name))
            .await?;

        // Fire-and-forget: the caller gets its receipt without waiting on
        // the pipeline.
        let runner = self.runner.clone();
        let run_id = id.clone();
        let name = original_name.to_string();
        tokio::spawn(async move {
            runner.run(&run_id, &path, &name).await;
        });

        tracing::info!(image_id = %id, original_name, "image queued for processing");
        Ok(UploadReceipt {
            image_id: id,
            status: ImageStatus::Processing,
            error: None,
        })
    }

    async fn reject(
        &self,
        id: String,
        original_name: &str,
    ) -> Result<UploadReceipt, ServiceError> {
        self.store
            .insert(ImageRecord::rejected(id.clone(), original_name, INVALID_FORMAT))
            .await?;
        Ok(UploadReceipt {
            image_id: id,
            status: ImageStatus::Failed,
            error: Some(INVALID_FORMAT.to_string()),
        })
    }

    /// All records, newest first, formatted for API consumers.
    pub async fn list(&self) -> Result<Vec<ImageResponse>, ServiceError> {
        let records = self.store.list_all().await?;
        Ok(records
            .iter()
            .map(|r| ImageResponse::from_record(r, &self.base_url))
            .collect())
    }

    /// One record by id, formatted for API consumers.
    pub async fn get(&self, id: &str) -> Result<ImageResponse, ServiceError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Image not found".to_string()))?;
        Ok(ImageResponse::from_record(&record, &self.base_url))
    }

    /// Raw thumbnail bytes for a processed item.
    ///
    /// Unknown presets and not-yet-processed items are bad requests;
    /// unknown ids and missing files are not found. The status gate also
    /// guarantees partial artifacts are never served.
    pub async fn thumbnail(&self, id: &str, preset: &str) -> Result<Vec<u8>, ServiceError> {
        let preset = ThumbnailPreset::parse(preset).ok_or_else(|| {
            ServiceError::BadRequest("Preset must be 'small' or 'medium'".to_string())
        })?;

        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Image not found".to_string()))?;

        if record.status != ImageStatus::Success {
            return Err(ServiceError::BadRequest(
                "Image not yet processed".to_string(),
            ));
        }

        self.files.read_thumbnail(id, preset).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ServiceError::NotFound("Thumbnail not found".to_string())
            } else {
                ServiceError::Io(e)
            }
        })
    }

    /// Aggregate counters over all records.
    pub async fn stats(&self) -> Result<StatsSummary, ServiceError> {
        let records = self.store.list_all().await?;
        Ok(stats::compute(&records))
    }
}
