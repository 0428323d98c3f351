//! Configuration for the storage helpers and the bundled clients

use crate::error::{Result, StorageError};
use bytesize::{KIB, MIB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest payload accepted by the upload helpers (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * MIB;

/// Chunk size used by resumable uploads (256 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * KIB as usize;

pub const DEFAULT_CACHE_CONTROL: &str = "public,max-age=7200";

/// Minimum change, in percentage points, between two progress reports
pub const DEFAULT_PROGRESS_THRESHOLD: f64 = 1.0;

/// Configuration shared by the helpers and the storage clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket name used in references and download URLs
    pub bucket: String,

    /// Directory backing the local client's bucket
    #[serde(rename = "root-dir")]
    pub root_dir: PathBuf,

    /// Base of generated download URLs (default: http://localhost:9199)
    #[serde(rename = "download-base-url")]
    pub download_base_url: String,

    /// Upload size limit in bytes
    #[serde(rename = "max-file-size")]
    pub max_file_size: u64,

    /// Resumable upload chunk size in bytes
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// Cache-Control header stored with uploaded objects
    #[serde(rename = "cache-control")]
    pub cache_control: String,

    /// Progress callback throttle, in percentage points
    #[serde(rename = "progress-threshold")]
    pub progress_threshold: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "default-bucket".to_string(),
            root_dir: PathBuf::from("./storage-data"),
            download_base_url: "http://localhost:9199".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
            progress_threshold: DEFAULT_PROGRESS_THRESHOLD,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: StorageConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn bucket<S: Into<String>>(mut self, bucket: S) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn root_dir<P: Into<PathBuf>>(mut self, root_dir: P) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn download_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.download_base_url = url.into();
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn cache_control<S: Into<String>>(mut self, cache_control: S) -> Self {
        self.cache_control = cache_control.into();
        self
    }

    pub fn progress_threshold(mut self, threshold: f64) -> Self {
        self.progress_threshold = threshold;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(StorageError::config_error("Bucket name cannot be empty"));
        }

        if self.chunk_size == 0 {
            return Err(StorageError::config_error(
                "Chunk size must be greater than 0",
            ));
        }

        if self.max_file_size == 0 {
            return Err(StorageError::config_error(
                "Max file size must be greater than 0",
            ));
        }

        if !self.progress_threshold.is_finite() || self.progress_threshold < 0.0 {
            return Err(StorageError::config_error(format!(
                "Progress threshold must be a non-negative number, got {}",
                self.progress_threshold
            )));
        }

        url::Url::parse(&self.download_base_url).map_err(|e| {
            StorageError::config_error(format!(
                "Invalid download base URL '{}': {}",
                self.download_base_url, e
            ))
        })?;

        Ok(())
    }
}
