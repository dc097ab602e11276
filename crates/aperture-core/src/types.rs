//! Core data types for the Aperture image pipeline.
//!
//! These types represent an image item's persisted record, its terminal
//! outcome, and the wire shapes returned to API consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle status of an image item.
///
/// `processing` is the initial state; `success` and `failed` are terminal
/// and a record never transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Processing,
    Success,
    Failed,
}

impl ImageStatus {
    /// Stable string form used in storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Processing => "processing",
            ImageStatus::Success => "success",
            ImageStatus::Failed => "failed",
        }
    }

    /// Parse the stable string form back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(ImageStatus::Processing),
            "success" => Some(ImageStatus::Success),
            "failed" => Some(ImageStatus::Failed),
            _ => None,
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::Success | ImageStatus::Failed)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intrinsic and derived properties of a successfully processed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Canonical format name ("jpeg", "png")
    pub format: String,

    /// Size of the stored source file in bytes
    pub size_bytes: u64,

    /// Embedded capture attributes, stringified. Empty when the image
    /// carries no EXIF or extraction failed.
    pub exif: BTreeMap<String, String>,

    /// Generated caption, if a caption backend produced one
    pub caption: Option<String>,
}

/// A named thumbnail size configuration: a maximum bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailPreset {
    Small,
    Medium,
}

impl ThumbnailPreset {
    /// All presets, in the order they are generated and listed.
    pub const ALL: [ThumbnailPreset; 2] = [ThumbnailPreset::Small, ThumbnailPreset::Medium];

    /// Preset name as it appears in URLs and file names.
    pub fn name(&self) -> &'static str {
        match self {
            ThumbnailPreset::Small => "small",
            ThumbnailPreset::Medium => "medium",
        }
    }

    /// Maximum bounding box (width, height) in pixels.
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            ThumbnailPreset::Small => (150, 150),
            ThumbnailPreset::Medium => (400, 400),
        }
    }

    /// Parse a preset name from a URL segment.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "small" => Some(ThumbnailPreset::Small),
            "medium" => Some(ThumbnailPreset::Medium),
            _ => None,
        }
    }
}

impl fmt::Display for ThumbnailPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The persisted record for one image item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Opaque unique identifier, assigned at upload, immutable
    pub id: String,

    /// Client-supplied filename; not authoritative for format
    pub original_name: String,

    /// Current lifecycle status
    pub status: ImageStatus,

    /// Set at insertion, immutable
    pub created_at: DateTime<Utc>,

    /// Set exactly once, when a terminal status is reached
    pub processed_at: Option<DateTime<Utc>>,

    /// Populated only when status is `success`
    pub metadata: Option<ImageMetadata>,

    /// Populated only when status is `failed`
    pub error: Option<String>,

    /// Wall-clock duration of the pipeline run; only when `success`
    pub processing_time_seconds: Option<f64>,
}

impl ImageRecord {
    /// A fresh record in `processing` state, about to enter the pipeline.
    pub fn new(id: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            original_name: original_name.into(),
            status: ImageStatus::Processing,
            created_at: Utc::now(),
            processed_at: None,
            metadata: None,
            error: None,
            processing_time_seconds: None,
        }
    }

    /// A record rejected at upload time: inserted directly as terminal
    /// `failed`, with `processed_at` set immediately and no pipeline run.
    pub fn rejected(
        id: impl Into<String>,
        original_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            original_name: original_name.into(),
            status: ImageStatus::Failed,
            created_at: now,
            processed_at: Some(now),
            metadata: None,
            error: Some(error.into()),
            processing_time_seconds: None,
        }
    }

    /// Apply a terminal outcome, overwriting all terminal fields together.
    ///
    /// Re-applying is idempotent by construction: every terminal field is
    /// assigned on every call, none appended.
    pub fn apply_terminal(&mut self, outcome: TerminalOutcome, processed_at: DateTime<Utc>) {
        self.status = outcome.status();
        self.processed_at = Some(processed_at);
        match outcome {
            TerminalOutcome::Success {
                metadata,
                processing_time_seconds,
            } => {
                self.metadata = Some(metadata);
                self.processing_time_seconds = Some(processing_time_seconds);
                self.error = None;
            }
            TerminalOutcome::Failed { error } => {
                self.metadata = None;
                self.processing_time_seconds = None;
                self.error = Some(error);
            }
        }
    }
}

/// The complete result of one pipeline run, written in a single atomic
/// store update.
#[derive(Debug, Clone)]
pub enum TerminalOutcome {
    Success {
        metadata: ImageMetadata,
        processing_time_seconds: f64,
    },
    Failed {
        error: String,
    },
}

impl TerminalOutcome {
    /// The terminal status this outcome maps to.
    pub fn status(&self) -> ImageStatus {
        match self {
            TerminalOutcome::Success { .. } => ImageStatus::Success,
            TerminalOutcome::Failed { .. } => ImageStatus::Failed,
        }
    }
}

/// Immediate response to an upload request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub image_id: String,
    pub status: ImageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Formatted record returned by the read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    pub status: ImageStatus,
    pub data: ResponseData,
    pub error: Option<String>,
}

/// Payload section of a formatted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub image_id: String,
    pub original_name: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub metadata: ResponseMetadata,
    pub thumbnails: BTreeMap<String, String>,
}

/// Metadata section of a formatted record.
///
/// Serializes as an empty object `{}` for items that have not reached
/// `success`: every field is optional and omitted when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageResponse {
    /// Format a persisted record for API consumers.
    ///
    /// `metadata` and `thumbnails` are only populated for `success` records;
    /// thumbnail URLs are derived from the configured base URL.
    pub fn from_record(record: &ImageRecord, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let (metadata, thumbnails) = match (&record.status, &record.metadata) {
            (ImageStatus::Success, Some(m)) => {
                let metadata = ResponseMetadata {
                    width: Some(m.width),
                    height: Some(m.height),
                    format: Some(m.format.clone()),
                    size_bytes: Some(m.size_bytes),
                    exif: (!m.exif.is_empty()).then(|| m.exif.clone()),
                    caption: m.caption.clone().filter(|c| !c.is_empty()),
                };
                let thumbnails = ThumbnailPreset::ALL
                    .iter()
                    .map(|preset| {
                        (
                            preset.name().to_string(),
                            format!("{base}/api/images/{}/thumbnails/{preset}", record.id),
                        )
                    })
                    .collect();
                (metadata, thumbnails)
            }
            _ => (ResponseMetadata::default(), BTreeMap::new()),
        };

        Self {
            status: record.status,
            data: ResponseData {
                image_id: record.id.clone(),
                original_name: record.original_name.clone(),
                processed_at: record.processed_at,
                metadata,
                thumbnails,
            },
            error: record.error.clone(),
        }
    }
}
