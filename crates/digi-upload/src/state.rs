//! Upload server state.

use crate::config::UploadConfig;
use crate::storage::DiskStore;

#[derive(Debug, Clone)]
pub struct UploadState {
    pub store: DiskStore,
    /// Host used in file URLs when a request carries no Host header
    pub fallback_host: String,
}

impl UploadState {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            store: DiskStore::new(config.upload_dir.clone()),
            fallback_host: config.public_host(),
        }
    }
}
