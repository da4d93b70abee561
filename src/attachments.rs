//! Multipart intake for loan-application attachments.
//!
//! The file part is checked against the [`UploadPolicy`] as soon as its headers
//! arrive and again for every chunk, so oversized or disallowed uploads are
//! rejected before any database work starts.

use std::collections::HashMap;

use anyhow::anyhow;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tracing::warn;

use autoloan_core::upload_policy::generate_file_name;
use autoloan_core::{AppError, UploadPolicy, UploadRejection};

use crate::metrics::track_upload_rejection;

/// Form field carrying the attachment.
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct UploadedFile {
    /// Generated storage name, `{field}-{millis}-{hex}{ext}`.
    pub name: String,
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn rejected(rejection: UploadRejection) -> AppError {
    warn!(reason = rejection.reason(), "Upload rejected");
    track_upload_rejection(rejection.reason());
    rejection.into()
}

fn multipart_error(err: MultipartError, policy: &UploadPolicy) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return rejected(policy.too_large());
    }
    AppError::bad_request(anyhow!("Invalid multipart body: {}", err.body_text()))
}

/// Reads every part of the request, enforcing type and size on the file part.
pub async fn read_multipart(
    mut multipart: Multipart,
    policy: &UploadPolicy,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, policy))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|e| multipart_error(e, policy))?;
            form.fields.insert(name, value);
            continue;
        };

        if name != FILE_FIELD {
            return Err(AppError::bad_request(anyhow!("Unexpected field: {}", name)));
        }
        if form.file.is_some() {
            return Err(AppError::bad_request(anyhow!("Only one file may be uploaded")));
        }

        let extension = policy
            .check_type(&original_name, field.content_type())
            .map_err(rejected)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, policy))? {
            policy
                .check_size(bytes.len() + chunk.len())
                .map_err(rejected)?;
            bytes.extend_from_slice(&chunk);
        }

        form.file = Some(UploadedFile {
            name: generate_file_name(FILE_FIELD, &extension),
            original_name,
            bytes,
        });
    }

    Ok(form)
}
