//! Thumbnail generation with JPEG output to durable storage.
//!
//! Every item gets one output per preset, resized to fit the preset's
//! bounding box with aspect ratio preserved. Output is always JPEG with the
//! color mode normalized to RGB, so indexed and alpha sources encode
//! correctly regardless of their original format.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;

use crate::config::ThumbnailConfig;
use crate::error::PipelineError;
use crate::storage::FileStore;
use crate::types::ThumbnailPreset;

/// Generates and persists thumbnails for processed items.
pub struct ThumbnailGenerator {
    files: Arc<FileStore>,
    quality: u8,
}

impl ThumbnailGenerator {
    /// Create a new generator writing through the given file store.
    pub fn new(files: Arc<FileStore>, config: ThumbnailConfig) -> Self {
        Self {
            files,
            quality: config.jpeg_quality,
        }
    }

    /// Generate every preset for an item.
    ///
    /// Thumbnails are not best-effort: failure of any preset fails the
    /// stage, and any preset already written for this item is removed so no
    /// partial set outlives the failure.
    pub fn generate_all(&self, id: &str, image: &DynamicImage) -> Result<(), PipelineError> {
        for preset in ThumbnailPreset::ALL {
            if let Err(e) = self.generate_one(id, preset, image) {
                self.files.remove_thumbnails(id);
                return Err(e);
            }
            tracing::debug!(id, preset = %preset, "thumbnail written");
        }
        Ok(())
    }

    fn generate_one(
        &self,
        id: &str,
        preset: ThumbnailPreset,
        image: &DynamicImage,
    ) -> Result<(), PipelineError> {
        let bytes = self.encode(preset, image)?;
        let path = self.files.thumbnail_path(id, preset);
        std::fs::write(&path, bytes).map_err(|e| PipelineError::Thumbnail {
            preset: preset.name().to_string(),
            message: format!("cannot write {}: {e}", path.display()),
        })
    }

    /// Resize to fit the preset's bounding box and encode as RGB JPEG.
    ///
    /// Sources already within the box are not upscaled.
    fn encode(&self, preset: ThumbnailPreset, image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
        let (max_w, max_h) = preset.bounds();
        let rgb = if image.width() <= max_w && image.height() <= max_h {
            image.to_rgb8()
        } else {
            image.resize(max_w, max_h, FilterType::Lanczos3).to_rgb8()
        };

        let mut buf = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| PipelineError::Thumbnail {
                preset: preset.name().to_string(),
                message: e.to_string(),
            })?;
        Ok(buf.into_inner())
    }
}
