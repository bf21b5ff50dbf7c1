//! Service configuration.
//!
//! The configuration is built once at startup and handed to the router
//! state; nothing reads storage roots or delays from globals.
//!
//! # Example
//!
//! ```rust
//! use docshift::ServiceConfig;
//!
//! let config: ServiceConfig = toml::from_str(r#"
//! [storage]
//! base_dir = "/var/lib/docshift"
//!
//! [cleanup]
//! output_retention_secs = 1200
//! "#).unwrap();
//!
//! assert_eq!(config.cleanup.output_retention_secs, 1200);
//! assert_eq!(config.cleanup.input_retention_secs, 300);
//! ```

use crate::{DocshiftError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the file searched for by [`ServiceConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "docshift.toml";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cleanup: CleanupConfig,
    pub upload: UploadConfig,
    pub workers: WorkerConfig,
    pub tools: ToolsConfig,
    pub render: RenderConfig,
}

/// Listener and HTTP behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Answer every error with HTTP 200 and an `{"error": ..}` body, as older clients expect.
    pub legacy_error_status: bool,
    pub max_request_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            legacy_error_status: false,
            max_request_body_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Category roots. Relative roots are resolved against `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_dir: PathBuf,
    pub downloads: PathBuf,
    pub pdf_uploads: PathBuf,
    pub excel_outputs: PathBuf,
    pub word_outputs: PathBuf,
    pub image_outputs: PathBuf,
    /// Remove stale artifacts left behind by a previous process on startup.
    pub sweep_on_startup: bool,
    pub sweep_max_age_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            downloads: PathBuf::from("downloads"),
            pdf_uploads: PathBuf::from("pdf_uploads"),
            excel_outputs: PathBuf::from("excel_outputs"),
            word_outputs: PathBuf::from("word_outputs"),
            image_outputs: PathBuf::from("image_outputs"),
            sweep_on_startup: true,
            sweep_max_age_secs: 900,
        }
    }
}

impl StorageConfig {
    pub fn sweep_max_age(&self) -> Duration {
        Duration::from_secs(self.sweep_max_age_secs)
    }
}

/// Deferred deletion delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Delay before a raw upload is removed.
    pub input_retention_secs: u64,
    /// Delay before a derived response artifact is removed.
    pub output_retention_secs: u64,
    /// Delay before a downloaded video is removed.
    pub video_retention_secs: u64,
    /// Maximum number of deletions waiting in the scheduler.
    pub max_pending: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            input_retention_secs: 300,
            output_retention_secs: 600,
            video_retention_secs: 300,
            max_pending: 65_536,
        }
    }
}

impl CleanupConfig {
    pub fn input_retention(&self) -> Duration {
        Duration::from_secs(self.input_retention_secs)
    }

    pub fn output_retention(&self) -> Duration {
        Duration::from_secs(self.output_retention_secs)
    }

    pub fn video_retention(&self) -> Duration {
        Duration::from_secs(self.video_retention_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::storage::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Blocking worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Conversions running at the same time.
    pub max_concurrent: usize,
    /// Conversions allowed to wait for a slot before new ones are rejected.
    pub max_queued: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1),
            max_queued: 64,
        }
    }
}

/// External programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: PathBuf,
    /// Explicit LibreOffice binary; located through env vars and PATH when unset.
    pub soffice: Option<PathBuf>,
    pub conversion_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            soffice: None,
            conversion_timeout_secs: crate::convert::office::DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// Page rasterization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub target_dpi: i32,
    pub max_image_dimension: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_dpi: 72,
            max_image_dimension: 65536,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DocshiftError::Validation` if the file cannot be read or is not valid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DocshiftError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Search the current directory and its parents for `docshift.toml`.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(DocshiftError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Apply `DOCSHIFT_*` environment overrides.
    ///
    /// Unparseable values are ignored with a warning so a typo never prevents startup.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DOCSHIFT_HOST")
            && !host.trim().is_empty()
        {
            self.server.host = host.trim().to_string();
        }

        if let Ok(value) = std::env::var("DOCSHIFT_PORT") {
            match value.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring DOCSHIFT_PORT='{}', must be a valid port", value),
            }
        }

        if let Some(dir) = std::env::var_os("DOCSHIFT_STORAGE_DIR").filter(|v| !v.is_empty()) {
            self.storage.base_dir = PathBuf::from(dir);
        }

        if let Ok(value) = std::env::var("DOCSHIFT_MAX_REQUEST_BODY_BYTES") {
            match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => self.server.max_request_body_bytes = bytes,
                _ => tracing::warn!(
                    "Ignoring DOCSHIFT_MAX_REQUEST_BODY_BYTES='{}', must be a positive integer",
                    value
                ),
            }
        }
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.upload.chunk_size == 0 {
            return Err(DocshiftError::validation("upload.chunk_size must be greater than zero"));
        }
        if self.workers.max_concurrent == 0 {
            return Err(DocshiftError::validation("workers.max_concurrent must be greater than zero"));
        }
        if self.cleanup.max_pending == 0 {
            return Err(DocshiftError::validation("cleanup.max_pending must be greater than zero"));
        }
        let max_secs = crate::storage::MAX_DELAY.as_secs();
        for (key, secs) in [
            ("cleanup.input_retention_secs", self.cleanup.input_retention_secs),
            ("cleanup.output_retention_secs", self.cleanup.output_retention_secs),
            ("cleanup.video_retention_secs", self.cleanup.video_retention_secs),
        ] {
            if secs > max_secs {
                return Err(DocshiftError::validation(format!(
                    "{key} must be at most {max_secs} seconds, got {secs}"
                )));
            }
        }
        Ok(())
    }
}
