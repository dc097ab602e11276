//! Configuration management for Aperture.
//!
//! Configuration is loaded from a platform config directory with sensible
//! defaults; every section tolerates partial files via `#[serde(default)]`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration structure for Aperture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// File and record storage settings
    pub storage: StorageConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Thumbnail encoding settings
    pub thumbnail: ThumbnailConfig,

    /// Caption backend settings
    pub caption: CaptionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind (e.g. "127.0.0.1:8000")
    pub bind: String,

    /// Base URL used when building thumbnail links in responses
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// File and record storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for uploads, thumbnails, and the record database
    pub data_dir: PathBuf,

    /// Database file name, created under `data_dir`
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.aperture/data"),
            db_file: "images.db".to_string(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Caption call timeout in milliseconds
    pub caption_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 25,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            caption_timeout_ms: 60000,
        }
    }
}

/// Thumbnail encoding settings. Preset bounding boxes are fixed; only the
/// output encoding is tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// JPEG quality for encoded thumbnails (1-100)
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

/// Caption backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Backend identifier: "none" disables captioning, "ollama" uses a
    /// local Ollama vision model
    pub provider: String,

    /// Ollama backend settings, used when provider = "ollama"
    pub ollama: OllamaCaptionConfig,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            ollama: OllamaCaptionConfig::default(),
        }
    }
}

/// Settings for the Ollama caption backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaCaptionConfig {
    /// Ollama HTTP endpoint
    pub endpoint: String,

    /// Vision model name
    pub model: String,
}

impl Default for OllamaCaptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Output format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.aperture/config.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "aperture", "aperture")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".aperture").join("config.toml")
            })
    }

    /// Get the resolved data directory (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let path_str = self.storage.data_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Directory where uploaded source files are stored.
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    /// Directory where generated thumbnails are stored.
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.data_dir().join("thumbnails")
    }

    /// Path of the record database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.db_file)
    }

    /// Check configuration values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be greater than 0".to_string(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.thumbnail.jpeg_quality) {
            return Err(ConfigError::ValidationError(format!(
                "thumbnail.jpeg_quality must be in 1..=100, got {}",
                self.thumbnail.jpeg_quality
            )));
        }
        match self.caption.provider.as_str() {
            "none" | "ollama" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "caption.provider must be \"none\" or \"ollama\", got \"{other}\""
                )));
            }
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.format must be \"pretty\" or \"json\", got \"{other}\""
                )));
            }
        }
        Ok(())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
