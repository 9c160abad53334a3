//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A required `R2_*` variable is missing
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("Upload to {bucket}/{key} failed: {message}")]
    UploadFailed {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Bucket {bucket} unreachable: {message}")]
    BucketUnreachable { bucket: String, message: String },
}

impl StorageError {
    pub(crate) fn missing_var(name: &str) -> Self {
        Self::NotConfigured(format!("{} not set", name))
    }

    pub fn upload_failed(bucket: &str, key: &str, message: impl Into<String>) -> Self {
        Self::UploadFailed {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }
}
