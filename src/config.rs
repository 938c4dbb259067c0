//! Configuration module for stowage.

use serde::Deserialize;
use std::path::Path;

use crate::file::{sanitize_folder_name, UploadLimits};
use crate::{Result, StowageError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on the duration of one request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// CORS allowed origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve the static frontend.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to the static frontend directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    15 * 60 // 15 minutes
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "public".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: vec![],
            serve_static: default_serve_static(),
            static_path: default_static_path(),
        }
    }
}

/// Storage layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory that holds every folder.
    #[serde(default = "default_root")]
    pub root: String,
    /// Folders guaranteed to exist after startup, in display order.
    #[serde(default = "default_folders")]
    pub default_folders: Vec<String>,
}

fn default_root() -> String {
    "uploads".to_string()
}

fn default_folders() -> Vec<String> {
    vec![
        "pictures".to_string(),
        "videos".to_string(),
        "documents".to_string(),
    ]
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_folders: default_folders(),
        }
    }
}

/// Upload limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of a single file in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// Maximum number of files in one upload request.
    #[serde(default = "default_max_files")]
    pub max_files_per_upload: usize,
    /// Accepted MIME types (empty = accept everything).
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// Folder that receives uploads whose target folder cannot be created.
    #[serde(default)]
    pub fallback_folder: Option<String>,
}

fn default_max_file_size() -> u64 {
    1024 // 1GB
}

fn default_max_files() -> usize {
    10
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "video/mp4",
        "video/quicktime",
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
            max_files_per_upload: default_max_files(),
            allowed_mime_types: default_allowed_mime_types(),
            fallback_folder: None,
        }
    }
}

impl UploadConfig {
    /// Maximum file size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Build the limits handed to the upload pipeline.
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_size: self.max_file_size_bytes(),
            max_files: self.max_files_per_upload,
            allowed_mime_types: self.allowed_mime_types.clone(),
            fallback_folder: self.fallback_folder.clone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file (empty = console only).
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StowageError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StowageError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STOWAGE_ROOT`: storage root directory
    /// - `STOWAGE_PORT`: listen port
    /// - `STOWAGE_MAX_FILE_SIZE_MB`: per-file size limit
    /// - `STOWAGE_MAX_FILES_PER_UPLOAD`: per-request file count limit
    /// - `STOWAGE_REQUEST_TIMEOUT_MINUTES`: request timeout
    /// - `STOWAGE_CORS_ORIGIN`: single allowed CORS origin (`*` = any)
    ///
    /// Numeric values that fail to parse leave the configured value in place.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = lookup("STOWAGE_ROOT") {
            self.storage.root = root;
        }
        if let Some(port) = lookup("STOWAGE_PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(mb) = lookup("STOWAGE_MAX_FILE_SIZE_MB").and_then(|v| v.trim().parse().ok()) {
            self.upload.max_file_size_mb = mb;
        }
        if let Some(n) = lookup("STOWAGE_MAX_FILES_PER_UPLOAD").and_then(|v| v.trim().parse().ok())
        {
            self.upload.max_files_per_upload = n;
        }
        if let Some(minutes) = lookup("STOWAGE_REQUEST_TIMEOUT_MINUTES")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.server.request_timeout_secs = minutes.saturating_mul(60);
        }
        if let Some(origin) = lookup("STOWAGE_CORS_ORIGIN") {
            self.server.cors_origins = if origin.trim() == "*" {
                vec![]
            } else {
                vec![origin.trim().to_string()]
            };
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The storage root is empty
    /// - A size or count limit is zero
    /// - A default or fallback folder name is not already in sanitized form
    pub fn validate(&self) -> Result<()> {
        if self.storage.root.trim().is_empty() {
            return Err(StowageError::Config("storage.root must not be empty".into()));
        }
        if self.upload.max_file_size_mb == 0 {
            return Err(StowageError::Config(
                "upload.max_file_size_mb must be greater than zero".into(),
            ));
        }
        if self.upload.max_files_per_upload == 0 {
            return Err(StowageError::Config(
                "upload.max_files_per_upload must be greater than zero".into(),
            ));
        }

        let configured = self
            .storage
            .default_folders
            .iter()
            .chain(self.upload.fallback_folder.iter());
        for name in configured {
            match sanitize_folder_name(name) {
                Ok(safe) if safe == *name => {}
                _ => {
                    return Err(StowageError::Config(format!(
                        "folder name '{name}' must only contain letters, digits, '_' and '-'"
                    )))
                }
            }
        }

        Ok(())
    }
}
