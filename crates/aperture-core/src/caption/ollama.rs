//! Ollama caption backend for local vision model inference.
//!
//! Talks to a local Ollama instance via its HTTP API.
//! No authentication required — just needs Ollama running locally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CaptionInput, Captioner};
use crate::error::PipelineError;

const PROMPT: &str = "Describe this image concisely in one sentence. \
     Focus on the main subject and setting.";

/// Caption backend backed by a local Ollama vision model.
pub struct OllamaCaptioner {
    endpoint: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaCaptioner {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

/// Ollama /api/generate request body.
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama /api/generate response.
#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Captioner for OllamaCaptioner {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(&self, input: &CaptionInput) -> Result<String, PipelineError> {
        let url = format!("{}/api/generate", self.endpoint);

        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: PROMPT.to_string(),
            images: vec![input.data.clone()],
            stream: false,
            options: OllamaOptions {
                temperature: 0.2,
                num_predict: 60,
            },
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Caption {
                message: format!("Ollama request failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Caption {
                message: format!("Ollama HTTP {status}: {text}"),
            });
        }

        let ollama_resp: OllamaResponse = resp.json().await.map_err(|e| PipelineError::Caption {
            message: format!("failed to parse Ollama response: {e}"),
        })?;

        let text = ollama_resp.response.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::Caption {
                message: "Ollama returned an empty response".to_string(),
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let captioner =
            OllamaCaptioner::new("http://localhost:11434/", "llava", Duration::from_secs(60));
        assert_eq!(captioner.endpoint, "http://localhost:11434");
        assert_eq!(captioner.name(), "ollama");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // Port 1 is never an Ollama instance; the call must error, not hang
        let captioner =
            OllamaCaptioner::new("http://127.0.0.1:1", "llava", Duration::from_millis(500));
        let input = CaptionInput::from_bytes(b"abc", "png");
        let result = captioner.generate(&input).await;
        assert!(matches!(result, Err(PipelineError::Caption { .. })));
        assert!(!captioner.is_available().await);
    }
}
