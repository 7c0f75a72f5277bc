use crate::config::S3Config;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Destinations that accept local files keyed by object name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` under `key`. An object already
    /// stored under the same key is replaced.
    async fn put_file(&self, local_path: &Path, key: &str) -> Result<(), UploadError>;
}

/// Errors from uploading a segment.
///
/// Local filesystem problems and store-side rejections are separate
/// variants so cycle logs say which side failed for a given file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store rejected {key}: {message}")]
    Store { key: String, message: String },
}

/// S3 uploader for video segments
pub struct S3Uploader {
    client: S3Client,
    bucket: String,
}

impl S3Uploader {
    /// Create a new S3 uploader with explicit credentials
    pub async fn new(config: &S3Config) -> Self {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "uploader-config",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let s3_config = s3_config_builder.build();
        let client = S3Client::from_conf(s3_config);

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 uploader initialized"
        );

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Uploader {
    #[instrument(skip(self, local_path), fields(path = %local_path.display(), key = %key))]
    async fn put_file(&self, local_path: &Path, key: &str) -> Result<(), UploadError> {
        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|source| UploadError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        debug!(size_bytes = metadata.len(), "Uploading segment to S3");

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|source| UploadError::Io {
                path: local_path.to_path_buf(),
                source: std::io::Error::other(source),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type_for(key))
            .send()
            .await
            .map_err(|source| UploadError::Store {
                key: key.to_string(),
                message: DisplayErrorContext(source).to_string(),
            })?;

        info!(size_bytes = metadata.len(), "Segment uploaded");
        Ok(())
    }
}

/// Get content type from the file name extension
fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> S3Config {
        S3Config {
            region: "us-east-1".to_string(),
            bucket: "test-bucket".to_string(),
            access_key_id: "AKIATEST".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("CLIP.MP4"), "video/mp4");
        assert_eq!(content_type_for("clip.mov"), "video/quicktime");
        assert_eq!(content_type_for("clip.mkv"), "video/x-matroska");
        assert_eq!(content_type_for("clip"), "application/octet-stream");
        assert_eq!(content_type_for("clip.mp4.tmp"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_missing_local_file_is_an_io_error() {
        let uploader = S3Uploader::new(&create_test_config()).await;
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.mp4");

        // Fails on the local stat, before any request is made.
        let err = uploader.put_file(&missing, "gone.mp4").await.unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }
}
