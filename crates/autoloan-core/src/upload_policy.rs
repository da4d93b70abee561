//! Attachment acceptance rules.
//!
//! An upload is accepted only when both its extension and its declared MIME
//! type are on the allow-list *and* agree with each other, and its size stays
//! within the configured ceiling.

use anyhow::anyhow;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::errors::AppError;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const MIB: usize = 1024 * 1024;

/// Extension allow-list with the MIME types each one may be declared as.
const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    ("jpeg", &["image/jpeg", "image/jpg", "image/pjpeg"]),
    ("jpg", &["image/jpeg", "image/jpg", "image/pjpeg"]),
    ("png", &["image/png"]),
    ("pdf", &["application/pdf"]),
    ("doc", &["application/msword"]),
    (
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
    ),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("Only images and documents (PDF, DOC, DOCX) are allowed!")]
    UnsupportedFileType,

    #[error("File too large. Maximum size is {max_mb} MB")]
    FileTooLarge { max_mb: usize },
}

impl UploadRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedFileType => "unsupported_type",
            Self::FileTooLarge { .. } => "too_large",
        }
    }
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        AppError::bad_request(anyhow!(rejection.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Checks the declared type and returns the normalized extension (lower-case, with dot).
    pub fn check_type(
        &self,
        original_name: &str,
        declared_mime: Option<&str>,
    ) -> Result<String, UploadRejection> {
        let extension = original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .ok_or(UploadRejection::UnsupportedFileType)?;

        let mimes = ALLOWED_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mimes)| *mimes)
            .ok_or(UploadRejection::UnsupportedFileType)?;

        let declared = declared_mime
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
            .ok_or(UploadRejection::UnsupportedFileType)?;

        if !mimes.contains(&declared.as_str()) {
            return Err(UploadRejection::UnsupportedFileType);
        }

        Ok(format!(".{}", extension))
    }

    /// Rejects once `received` bytes exceed the ceiling.
    pub fn check_size(&self, received: usize) -> Result<(), UploadRejection> {
        if received > self.max_bytes {
            return Err(self.too_large());
        }
        Ok(())
    }

    pub fn too_large(&self) -> UploadRejection {
        UploadRejection::FileTooLarge {
            max_mb: self.max_bytes.div_ceil(MIB),
        }
    }

    /// Body limit for routes that accept an attachment plus form fields.
    pub fn body_limit(&self) -> usize {
        self.max_bytes + MIB
    }
}

/// Content type to serve a stored attachment with.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    ALLOWED_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .and_then(|(_, mimes)| mimes.first().copied())
        .unwrap_or("application/octet-stream")
}

/// `{field}-{millis}-{16 hex chars}{ext}`, with the random part drawn from the OS RNG.
pub fn generate_file_name(field_name: &str, extension: &str) -> String {
    let mut random = [0u8; 8];
    OsRng.fill_bytes(&mut random);

    format!(
        "{}-{}-{}{}",
        field_name,
        Utc::now().timestamp_millis(),
        hex::encode(random),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_extension_and_mime() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.check_type("licence.PDF", Some("application/pdf")).unwrap(),
            ".pdf"
        );
        assert_eq!(policy.check_type("car.jpg", Some("image/jpeg")).unwrap(), ".jpg");
        assert_eq!(
            policy
                .check_type(
                    "payslip.docx",
                    Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
                )
                .unwrap(),
            ".docx"
        );
    }

    #[test]
    fn test_rejects_disallowed_extension() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.check_type("setup.exe", Some("application/pdf")),
            Err(UploadRejection::UnsupportedFileType)
        );
        assert_eq!(
            policy.check_type("noextension", Some("application/pdf")),
            Err(UploadRejection::UnsupportedFileType)
        );
    }

    #[test]
    fn test_rejects_mismatched_mime() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.check_type("scan.pdf", Some("image/png")),
            Err(UploadRejection::UnsupportedFileType)
        );
        assert_eq!(
            policy.check_type("scan.pdf", Some("application/x-msdownload")),
            Err(UploadRejection::UnsupportedFileType)
        );
        assert_eq!(
            policy.check_type("scan.pdf", None),
            Err(UploadRejection::UnsupportedFileType)
        );
    }

    #[test]
    fn test_mime_parameters_are_ignored() {
        let policy = UploadPolicy::default();
        assert!(policy.check_type("scan.pdf", Some("application/pdf; charset=binary")).is_ok());
    }

    #[test]
    fn test_size_ceiling() {
        let policy = UploadPolicy::default();
        assert!(policy.check_size(DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert_eq!(
            policy.check_size(DEFAULT_MAX_UPLOAD_BYTES + 1),
            Err(UploadRejection::FileTooLarge { max_mb: 5 })
        );
        assert_eq!(
            policy.too_large().to_string(),
            "File too large. Maximum size is 5 MB"
        );
    }

    #[test]
    fn test_generated_name_shape() {
        let name = generate_file_name("file", ".pdf");
        let parts: Vec<&str> = name.trim_end_matches(".pdf").splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "file");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn test_generated_names_differ() {
        assert_ne!(generate_file_name("file", ".png"), generate_file_name("file", ".png"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
    }
}
