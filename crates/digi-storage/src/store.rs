//! Upload contract used by the API.

use async_trait::async_trait;
use chrono::Utc;
use digi_models::{file_extension, UploadKind};
use rand::distr::Alphanumeric;
use rand::Rng;

use crate::client::R2Client;
use crate::error::StorageResult;

const RANDOM_SUFFIX_LEN: usize = 10;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub bucket: String,
    pub key: String,
    pub public_url: String,
}

/// Stores applicant files and hands back a public URL.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store a file of the given kind under a fresh object key.
    async fn upload(
        &self,
        kind: UploadKind,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredFile>;

    /// Check that the backing buckets are reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

/// Object key for an uploaded file: `{millis}-{random}.{ext}`.
///
/// The extension comes from the original file name; names without one
/// fall back to `bin`.
pub fn object_key(file_name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    let ext = file_extension(file_name).unwrap_or("bin").to_ascii_lowercase();
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}

#[async_trait]
impl FileStore for R2Client {
    async fn upload(
        &self,
        kind: UploadKind,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredFile> {
        let bucket = self.config().bucket_for(kind).to_string();
        let key = object_key(file_name);
        self.upload_bytes(&bucket, &key, data, content_type).await?;
        let public_url = self.config().public_url(&bucket, &key);
        Ok(StoredFile {
            bucket,
            key,
            public_url,
        })
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        R2Client::check_connectivity(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_shape() {
        let key = object_key("My CV.PDF");
        let (stem, ext) = key.rsplit_once('.').unwrap();
        assert_eq!(ext, "pdf");

        let (millis, suffix) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), RANDOM_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_object_key_without_extension() {
        assert!(object_key("photo").ends_with(".bin"));
    }

    #[test]
    fn test_object_keys_are_unique() {
        assert_ne!(object_key("a.png"), object_key("a.png"));
    }
}
