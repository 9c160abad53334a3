//! Upload rules shared by the API and the standalone upload server.

use serde::{Deserialize, Serialize};

/// Kind of file an applicant can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// Curriculum vitae, PDF only
    Cv,
    /// Profile photo, any image type
    Photo,
}

impl UploadKind {
    pub const ALL: [UploadKind; 2] = [UploadKind::Cv, UploadKind::Photo];

    /// Multipart field name carrying the file.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Cv => "cv",
            Self::Photo => "photo",
        }
    }

    /// Maximum accepted size in bytes.
    pub fn max_bytes(&self) -> usize {
        match self {
            Self::Cv => 5 * 1024 * 1024,
            Self::Photo => 2 * 1024 * 1024,
        }
    }

    /// True if the declared content type is allowed.
    pub fn accepts(&self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            Self::Cv => mime == "application/pdf",
            Self::Photo => mime.starts_with("image/"),
        }
    }

    /// Message returned when the content type is rejected.
    pub fn rejection_message(&self) -> &'static str {
        match self {
            Self::Cv => "Not a PDF file! Please upload only PDF files.",
            Self::Photo => "Not an image! Please upload only image files.",
        }
    }

    /// Default object-storage bucket.
    pub fn bucket(&self) -> &'static str {
        match self {
            Self::Cv => "cv-files",
            Self::Photo => "profile-photos",
        }
    }

    /// Subdirectory used by the disk-backed upload server.
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Cv => "cv",
            Self::Photo => "photos",
        }
    }

    /// File name prefix used by the disk-backed upload server.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::Cv => "cv",
            Self::Photo => "photo",
        }
    }

    /// Form field that stores the resulting URL.
    pub fn url_field(&self) -> crate::Field {
        match self {
            Self::Cv => crate::Field::CvUrl,
            Self::Photo => crate::Field::FotoUrl,
        }
    }

    /// Check a received file against the type and size rules.
    pub fn check(&self, content_type: Option<&str>, size: usize) -> Result<(), UploadRejection> {
        if !content_type.is_some_and(|ct| self.accepts(ct)) {
            return Err(UploadRejection::WrongType(*self));
        }
        if size > self.max_bytes() {
            return Err(UploadRejection::TooLarge(*self));
        }
        Ok(())
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Why an upload was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    /// The form carried no file under the expected field
    #[error("No file uploaded")]
    NoFile,
    #[error("{}", .0.rejection_message())]
    WrongType(UploadKind),
    #[error("File size too large")]
    TooLarge(UploadKind),
}

impl UploadRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoFile => "No file uploaded",
            Self::WrongType(kind) => kind.rejection_message(),
            Self::TooLarge(_) => "File size too large",
        }
    }
}

/// Extension of a file name, without the dot, if it has one.
pub fn file_extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cv_accepts_only_pdf() {
        assert!(UploadKind::Cv.accepts("application/pdf"));
        assert!(UploadKind::Cv.accepts("Application/PDF; charset=binary"));
        assert!(!UploadKind::Cv.accepts("image/png"));
        assert!(!UploadKind::Cv.accepts("application/x-pdf"));
    }

    #[test]
    fn test_photo_accepts_any_image() {
        for ct in ["image/png", "image/jpeg", "image/webp"] {
            assert!(UploadKind::Photo.accepts(ct));
        }
        assert!(!UploadKind::Photo.accepts("application/pdf"));
    }

    #[test]
    fn test_check_order_and_limits() {
        let cv = UploadKind::Cv;
        assert_eq!(cv.check(Some("application/pdf"), 5 * 1024 * 1024), Ok(()));
        assert_eq!(
            cv.check(Some("application/pdf"), 5 * 1024 * 1024 + 1),
            Err(UploadRejection::TooLarge(cv))
        );
        assert_eq!(cv.check(None, 10), Err(UploadRejection::WrongType(cv)));

        let photo = UploadKind::Photo;
        assert_eq!(
            photo.check(Some("image/png"), 3 * 1024 * 1024),
            Err(UploadRejection::TooLarge(photo))
        );
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(UploadRejection::NoFile.message(), "No file uploaded");
        assert_eq!(
            UploadRejection::WrongType(UploadKind::Cv).message(),
            "Not a PDF file! Please upload only PDF files."
        );
        assert_eq!(
            UploadRejection::WrongType(UploadKind::Photo).message(),
            "Not an image! Please upload only image files."
        );
        assert_eq!(
            UploadRejection::TooLarge(UploadKind::Photo).message(),
            "File size too large"
        );
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("resume.pdf"), Some("pdf"));
        assert_eq!(file_extension("me.final.JPG"), Some("JPG"));
        assert_eq!(file_extension("dir.v2/README"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("noext"), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(UploadKind::Cv.field_name(), "cv");
        assert_eq!(UploadKind::Photo.directory(), "photos");
        assert_eq!(UploadKind::Photo.url_field(), crate::Field::FotoUrl);
    }
}
