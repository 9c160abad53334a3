//! Disk layout for uploaded files.

use std::path::{Path, PathBuf};

use chrono::Utc;
use digi_models::{file_extension, UploadKind};
use rand::Rng;
use tracing::debug;

/// Upload directory with one subdirectory per upload kind.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and every kind directory if missing.
    pub async fn prepare(&self) -> std::io::Result<()> {
        for kind in UploadKind::ALL {
            let dir = self.root.join(kind.directory());
            tokio::fs::create_dir_all(&dir).await?;
            debug!("Upload directory ready: {}", dir.display());
        }
        Ok(())
    }

    /// Disk path for a stored file.
    pub fn path_for(&self, kind: UploadKind, name: &str) -> PathBuf {
        self.root.join(kind.directory()).join(name)
    }
}

/// Stored name: `{prefix}-{millis}-{random}{.ext}`, keeping the original
/// extension as sent.
pub fn stored_name(kind: UploadKind, original_name: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    let ext = file_extension(original_name)
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!(
        "{}-{}-{}{}",
        kind.file_prefix(),
        Utc::now().timestamp_millis(),
        suffix,
        ext
    )
}

/// URL path a stored file is served under.
pub fn public_path(kind: UploadKind, name: &str) -> String {
    format!("/uploads/{}/{}", kind.directory(), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_shape() {
        let name = stored_name(UploadKind::Cv, "My Resume.pdf");
        assert!(name.starts_with("cv-"));
        assert!(name.ends_with(".pdf"));

        let parts: Vec<&str> = name.trim_end_matches(".pdf").split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u32>().is_ok());
    }

    #[test]
    fn test_stored_name_without_extension() {
        let name = stored_name(UploadKind::Photo, "selfie");
        assert!(name.starts_with("photo-"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_public_path_uses_kind_directory() {
        assert_eq!(public_path(UploadKind::Photo, "a.png"), "/uploads/photos/a.png");
        assert_eq!(public_path(UploadKind::Cv, "b.pdf"), "/uploads/cv/b.pdf");
    }

    #[tokio::test]
    async fn test_prepare_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("uploads"));
        store.prepare().await.unwrap();
        store.prepare().await.unwrap();

        assert!(dir.path().join("uploads/cv").is_dir());
        assert!(dir.path().join("uploads/photos").is_dir());
        assert_eq!(
            store.path_for(UploadKind::Cv, "x.pdf"),
            dir.path().join("uploads/cv/x.pdf")
        );
    }
}
