use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use autoloan_core::upload_policy::content_type_for;
use autoloan_core::{AppError, LocalAttachmentStorage};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

async fn read_attachment(state: &AppState, filename: &str) -> Result<Response, AppError> {
    let bytes = state.storage.read(filename).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(filename)),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        bytes,
    )
        .into_response())
}

/// Fetch an attachment. Only the owning applicant and admins may read it.
#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    params(("filename" = String, Path, description = "Stored attachment name")),
    responses(
        (status = 200, description = "Attachment content"),
        (status = 400, description = "Authentication failed or invalid name"),
        (status = 403, description = "Access denied: Insufficient permissions"),
        (status = 404, description = "File not found")
    ),
    tag = "Uploads",
    security(("bearer_auth" = []))
)]
pub async fn serve_upload(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    LocalAttachmentStorage::validate_key(&filename)?;

    let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM loan_applications WHERE file = $1")
        .bind(&filename)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("File not found")))?;

    if !auth_user.can_access(owner) {
        return Err(AppError::access_denied());
    }

    read_attachment(&state, &filename).await
}

/// Unauthenticated variant, mounted when `ATTACHMENTS_PUBLIC=true`.
pub async fn serve_public_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    LocalAttachmentStorage::validate_key(&filename)?;
    read_attachment(&state, &filename).await
}
