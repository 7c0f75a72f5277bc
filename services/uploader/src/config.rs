//! Configuration management for the uploader service.
//!
//! Configuration is loaded from files and environment variables, then passed
//! through [`Config::validate`], which checks the required fields and reports
//! the logical name of the capture component this service depends on.

use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the uploader service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// S3 configuration
    #[serde(default)]
    pub s3: S3Config,
    /// Upload cycle configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Capture component configuration
    #[serde(default)]
    pub video_store: VideoStoreConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Enable Prometheus metrics export
    #[serde(default)]
    pub enable_metrics: bool,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// S3 destination configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// AWS region
    #[serde(default)]
    pub region: String,
    /// S3 bucket name for uploaded segments
    #[serde(default)]
    pub bucket: String,
    /// AWS access key ID
    #[serde(default)]
    pub access_key_id: String,
    /// AWS secret access key
    #[serde(default)]
    pub secret_access_key: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
}

/// Upload cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Local directory the capture component writes finished segments into
    #[serde(default)]
    pub local_path: String,
    /// Minutes between upload cycles; also the length of the capture window
    #[serde(default)]
    pub interval_minutes: u64,
    /// Seconds to wait after the save command before scanning, giving the
    /// capture component time to finish writing files to disk
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    /// Substring a file name must contain to be treated as a video segment
    #[serde(default = "default_video_marker")]
    pub video_marker: String,
}

/// Capture component configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VideoStoreConfig {
    /// Logical name of the capture component this service depends on
    #[serde(default)]
    pub name: String,
    /// Command endpoint of the capture component. When unset, the service
    /// skips the save trigger and only sweeps files already on disk.
    pub endpoint: Option<String>,
    /// Request timeout for save commands in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Default value functions
fn default_service_name() -> String {
    "uploader-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_settle_delay_secs() -> u64 {
    15
}

fn default_video_marker() -> String {
    ".mp4".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/uploader").required(false))
            .add_source(config::File::with_name("/etc/nier/uploader").required(false))
            // Override with environment variables
            // UPLOADER__S3__BUCKET -> s3.bucket
            .add_source(
                config::Environment::with_prefix("UPLOADER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Create configuration from environment variables only.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("UPLOADER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Validate the configuration.
    ///
    /// Checks the required fields in a fixed order and reports the first one
    /// that is missing. On success, returns the logical names of the
    /// components this service depends on: the capture component named in
    /// `video_store.name`.
    pub fn validate(&self) -> Result<Vec<String>, ConfigValidationError> {
        if self.s3.region.is_empty() {
            return Err(ConfigValidationError::MissingField("s3.region".to_string()));
        }
        if self.s3.bucket.is_empty() {
            return Err(ConfigValidationError::MissingField("s3.bucket".to_string()));
        }
        if self.upload.local_path.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "upload.local_path".to_string(),
            ));
        }
        if self.s3.access_key_id.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "s3.access_key_id".to_string(),
            ));
        }
        if self.s3.secret_access_key.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "s3.secret_access_key".to_string(),
            ));
        }
        if self.video_store.name.is_empty() {
            return Err(ConfigValidationError::MissingField(
                "video_store.name".to_string(),
            ));
        }
        // A zero-minute timer is meaningless, so zero counts as unset.
        if self.upload.interval_minutes == 0 {
            return Err(ConfigValidationError::MissingField(
                "upload.interval_minutes".to_string(),
            ));
        }
        if self.upload.video_marker.is_empty() {
            return Err(ConfigValidationError::InvalidValue {
                field: "upload.video_marker".to_string(),
                message: "marker must be a non-empty substring".to_string(),
            });
        }

        Ok(vec![self.video_store.name.clone()])
    }
}

impl UploadConfig {
    /// Get the cycle interval as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    /// Get the post-save settle delay as Duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

impl VideoStoreConfig {
    /// Get the save command timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: String::new(),
            bucket: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            local_path: String::new(),
            interval_minutes: 0,
            settle_delay_secs: default_settle_delay_secs(),
            video_marker: default_video_marker(),
        }
    }
}

impl Default for VideoStoreConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
