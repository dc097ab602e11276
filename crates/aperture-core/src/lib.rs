//! Aperture Core - embeddable image ingestion and processing library.
//!
//! Aperture accepts uploaded images, validates their format, and
//! asynchronously transforms each one into a durable record: decoded
//! dimensions, format, size, EXIF metadata, two thumbnail presets, and an
//! optional generated caption. Readers poll the record by its opaque id.
//!
//! # Architecture
//!
//! ```text
//! Upload → Validate → [processing record] → Decode → Extract Metadata
//!        → Thumbnails → Caption (best-effort) → [terminal record]
//! ```
//!
//! The pipeline runs out-of-band from the upload call: the caller gets its
//! receipt as soon as the `processing` record is durable. Each item reaches
//! exactly one terminal state (`success` or `failed`), written atomically.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aperture_core::{caption, Config, FileStore, ImageService, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let files = Arc::new(FileStore::from_config(&config)?);
//!     let store = Arc::new(SqliteStore::open(&config.db_path())?);
//!     let captioner = caption::from_config(&config.caption, caption_timeout);
//!     let service = ImageService::new(&config, store, files, captioner);
//!
//!     let receipt = service.upload("photo.jpg", bytes).await?;
//!     println!("queued: {}", receipt.image_id);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod caption;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod stats;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use caption::{CaptionInput, Captioner, DisabledCaptioner, OllamaCaptioner};
pub use config::Config;
pub use error::{
    ApertureError, ConfigError, PipelineError, PipelineResult, Result, ServiceError, StoreError,
};
pub use pipeline::{ImageDecoder, PipelineRunner, ThumbnailGenerator, Validator};
pub use service::ImageService;
pub use stats::StatsSummary;
pub use storage::FileStore;
pub use store::{MemoryStore, RecordStore, SqliteStore};
pub use types::{
    ImageMetadata, ImageRecord, ImageResponse, ImageStatus, TerminalOutcome, ThumbnailPreset,
    UploadReceipt,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
