//! Best-effort caption generation behind a pluggable interface.
//!
//! The orchestrator is decoupled from whether a caption backend is present,
//! remote, or absent entirely: a disabled no-op implementation is a valid
//! substitute, and every backend failure is swallowed upstream into an
//! empty caption. Captioning can never fail the pipeline.

pub mod ollama;

pub use ollama::OllamaCaptioner;

use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CaptionConfig;
use crate::error::PipelineError;

/// Base64-encoded image ready to send to a caption backend.
#[derive(Debug, Clone)]
pub struct CaptionInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl CaptionInput {
    /// Create a `CaptionInput` from raw bytes and a canonical format name.
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            other => {
                tracing::warn!("unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }
}

/// Trait that all caption backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the orchestrator holds an `Arc<dyn Captioner>`).
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Backend name for logging (e.g., "ollama", "disabled").
    fn name(&self) -> &str;

    /// Check whether the backend is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate a natural-language caption for the given image.
    async fn generate(&self, input: &CaptionInput) -> Result<String, PipelineError>;
}

/// No-op backend for deployments without caption capability.
pub struct DisabledCaptioner;

#[async_trait]
impl Captioner for DisabledCaptioner {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _input: &CaptionInput) -> Result<String, PipelineError> {
        Ok(String::new())
    }
}

/// Create the caption backend selected by configuration.
pub fn from_config(config: &CaptionConfig, timeout: Duration) -> Arc<dyn Captioner> {
    match config.provider.as_str() {
        "ollama" => Arc::new(OllamaCaptioner::new(
            &config.ollama.endpoint,
            &config.ollama.model,
            timeout,
        )),
        _ => Arc::new(DisabledCaptioner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_input_media_type() {
        let input = CaptionInput::from_bytes(b"abc", "png");
        assert_eq!(input.media_type, "image/png");
        assert_eq!(input.data, "YWJj");

        let input = CaptionInput::from_bytes(b"abc", "jpeg");
        assert_eq!(input.media_type, "image/jpeg");

        // Unknown formats fall back instead of erroring
        let input = CaptionInput::from_bytes(b"abc", "tiff");
        assert_eq!(input.media_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_disabled_captioner_returns_empty() {
        let captioner = DisabledCaptioner;
        let input = CaptionInput::from_bytes(b"abc", "png");
        assert_eq!(captioner.generate(&input).await.unwrap(), "");
        assert!(!captioner.is_available().await);
    }

    #[test]
    fn test_factory_selects_backend() {
        let mut config = CaptionConfig::default();
        let captioner = from_config(&config, Duration::from_secs(60));
        assert_eq!(captioner.name(), "disabled");

        config.provider = "ollama".to_string();
        let captioner = from_config(&config, Duration::from_secs(60));
        assert_eq!(captioner.name(), "ollama");
    }
}
