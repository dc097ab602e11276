//! Upload format validation.
//!
//! An upload is accepted only when its filename extension is in the allowed
//! set AND the saved bytes decode as one of the allowed raster formats,
//! independent of what the extension claims. The check is pure: it reads the
//! saved file and has no side effects.

use image::ImageFormat;
use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Filename extensions accepted at upload time.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Validates uploads before they enter the pipeline.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Return the lowercased extension if the filename carries an allowed one.
    pub fn allowed_extension(original_name: &str) -> Option<String> {
        let ext = original_name.rsplit_once('.')?.1.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// Validate the actually-saved bytes of an upload.
    ///
    /// Checks, in order: the file exists, its size is within limits, its
    /// magic bytes match an allowed format, and the content fully decodes as
    /// JPEG or PNG. A renamed GIF, a truncated JPEG, or arbitrary bytes all
    /// fail here regardless of extension.
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let file_len = std::fs::metadata(path)
            .map_err(|e| PipelineError::InvalidFormat {
                reason: format!("cannot stat file: {e}"),
            })?
            .len();

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if file_len > max_bytes {
            return Err(PipelineError::FileTooLarge {
                size_mb: file_len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_magic_bytes(path)?;
        self.check_decodes(path)
    }

    /// Cheap magic-byte prefilter before the full decode.
    fn check_magic_bytes(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::InvalidFormat {
            reason: format!("cannot open file: {e}"),
        })?;

        let mut header = [0u8; 8];
        let bytes_read = file.read(&mut header).unwrap_or(0);

        if bytes_read < 4 {
            return Err(PipelineError::InvalidFormat {
                reason: "file too small to be a valid image".to_string(),
            });
        }

        if !Self::is_allowed_image_header(&header) {
            return Err(PipelineError::InvalidFormat {
                reason: "unrecognized image signature".to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match an allowed format.
    fn is_allowed_image_header(header: &[u8; 8]) -> bool {
        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return true;
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return true;
        }

        false
    }

    /// Fully decode the content and confirm the intrinsic format is allowed.
    fn check_decodes(&self, path: &Path) -> Result<(), PipelineError> {
        let file = std::fs::File::open(path).map_err(|e| PipelineError::InvalidFormat {
            reason: format!("cannot open file: {e}"),
        })?;
        let reader = image::ImageReader::new(std::io::BufReader::new(file))
            .with_guessed_format()
            .map_err(|e| PipelineError::InvalidFormat {
                reason: format!("cannot detect image format: {e}"),
            })?;

        match reader.format() {
            Some(ImageFormat::Jpeg) | Some(ImageFormat::Png) => {}
            Some(other) => {
                return Err(PipelineError::InvalidFormat {
                    reason: format!("unsupported image format: {other:?}"),
                });
            }
            None => {
                return Err(PipelineError::InvalidFormat {
                    reason: "content is not a recognizable image".to_string(),
                });
            }
        }

        reader.decode().map_err(|e| PipelineError::InvalidFormat {
            reason: format!("content does not decode: {e}"),
        })?;

        Ok(())
    }
}
