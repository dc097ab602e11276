//! Image processing pipeline components.
//!
//! This module contains all the stages of the processing pipeline:
//! - **validate**: upload-time format validation
//! - **decode**: load and decode stored source images
//! - **metadata**: extract EXIF metadata
//! - **thumbnail**: generate JPEG thumbnails per preset
//! - **processor**: orchestrates the full pipeline and owns status
//!   transitions

pub mod decode;
pub mod metadata;
pub mod processor;
pub mod thumbnail;
pub mod validate;

// Re-exports for convenient access
pub use decode::{format_to_string, DecodedImage, ImageDecoder};
pub use metadata::MetadataExtractor;
pub use processor::PipelineRunner;
pub use thumbnail::ThumbnailGenerator;
pub use validate::{Validator, ALLOWED_EXTENSIONS};
