use axum::Json;
use axum::extract::{Path, State};

use autoloan_core::{AppError, MessageResponse};
use autoloan_models::{CreateLoanDto, Loan, UpdateLoanDto};

use super::service::LoanService;
use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::parse_id;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/loans",
    responses(
        (status = 200, description = "All loan products", body = Vec<Loan>),
        (status = 400, description = "Authentication failed", body = MessageResponse)
    ),
    tag = "Loans",
    security(("bearer_auth" = []))
)]
pub async fn list_loans(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Loan>>, AppError> {
    Ok(Json(LoanService::list_loans(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/loans/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan product", body = Loan),
        (status = 404, description = "Loan not found", body = MessageResponse)
    ),
    tag = "Loans",
    security(("bearer_auth" = []))
)]
pub async fn get_loan(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Loan>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(LoanService::get_loan(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/loans",
    request_body = CreateLoanDto,
    responses(
        (status = 200, description = "Loan added successfully", body = MessageResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse)
    ),
    tag = "Loans",
    security(("bearer_auth" = []))
)]
pub async fn create_loan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateLoanDto>,
) -> Result<Json<MessageResponse>, AppError> {
    LoanService::create_loan(&state.db, dto).await?;
    Ok(Json(MessageResponse::new("Loan added successfully")))
}

#[utoipa::path(
    put,
    path = "/loans/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan ID")),
    request_body = UpdateLoanDto,
    responses(
        (status = 200, description = "Loan updated successfully", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse),
        (status = 404, description = "Loan not found", body = MessageResponse)
    ),
    tag = "Loans",
    security(("bearer_auth" = []))
)]
pub async fn update_loan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateLoanDto>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    LoanService::update_loan(&state.db, id, dto).await?;
    Ok(Json(MessageResponse::new("Loan updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/loans/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan deleted successfully", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse),
        (status = 404, description = "Loan not found", body = MessageResponse)
    ),
    tag = "Loans",
    security(("bearer_auth" = []))
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    LoanService::delete_loan(&state.db, id).await?;
    Ok(Json(MessageResponse::new("Loan deleted successfully")))
}
