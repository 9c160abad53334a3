//! R2 client implementation.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use digi_models::UploadKind;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL objects are served from
    pub public_base_url: String,
    /// Bucket for CV uploads
    pub cv_bucket: String,
    /// Bucket for profile photos
    pub photo_bucket: String,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let required =
            |name: &str| std::env::var(name).map_err(|_| StorageError::missing_var(name));
        let endpoint_url = required("R2_ENDPOINT_URL")?;
        Ok(Self {
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("R2_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| endpoint_url.clone()),
            cv_bucket: std::env::var("R2_CV_BUCKET")
                .unwrap_or_else(|_| UploadKind::Cv.bucket().to_string()),
            photo_bucket: std::env::var("R2_PHOTO_BUCKET")
                .unwrap_or_else(|_| UploadKind::Photo.bucket().to_string()),
            endpoint_url,
        })
    }

    /// Bucket an upload kind is stored in.
    pub fn bucket_for(&self, kind: UploadKind) -> &str {
        match kind {
            UploadKind::Cv => &self.cv_bucket,
            UploadKind::Photo => &self.photo_bucket,
        }
    }

    /// Public URL of an object.
    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            bucket,
            key.trim_start_matches('/')
        )
    }
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    config: R2Config,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    pub fn config(&self) -> &R2Config {
        &self.config
    }

    /// Upload bytes to a bucket.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty object key".to_string()));
        }
        debug!("Uploading {} bytes to {}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(bucket, key, e.to_string()))?;

        info!("Uploaded {}/{}", bucket, key);
        Ok(())
    }

    /// Check connectivity to R2 by performing a head bucket operation on
    /// every upload bucket.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        for kind in UploadKind::ALL {
            let bucket = self.config.bucket_for(kind);
            self.client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| StorageError::BucketUnreachable {
                    bucket: bucket.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}
