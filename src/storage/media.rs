//! S3-compatible object store
//!
//! Works against AWS S3, MinIO, R2 or anything else speaking the S3 API.
//! Objects are served from `storage.public_url`.

use aws_sdk_s3::Client as S3Client;
use axum::async_trait;

use super::{ObjectStore, build_s3_http_client, public_url_for};
use crate::config::StorageConfig;
use crate::error::AppError;

/// Image storage backed by an S3 bucket
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    /// Public URL base, e.g. "https://cdn.example.com/images-bucket"
    public_url: String,
}

impl S3ObjectStore {
    /// Create new storage client
    ///
    /// # Errors
    /// Returns error if the endpoint is not a valid URL
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        use aws_sdk_s3::config::BehaviorVersion;
        use aws_sdk_s3::config::{Credentials, Region};

        url::Url::parse(&config.endpoint).map_err(|e| {
            AppError::Config(format!("storage.endpoint is not a valid URL: {}", e))
        })?;

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "friendfeed-storage",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_s3_http_client())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url: config.public_url.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control("public, max-age=31536000") // 1 year
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {}", e)))?;

        tracing::debug!(bucket = %self.bucket, key, size, "Object uploaded");

        Ok(public_url_for(&self.public_url, key))
    }
}
