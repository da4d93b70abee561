use anyhow::anyhow;
use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header;

use autoloan_core::{AppError, MessageResponse};
use autoloan_models::loan_applications::{parse_amount, parse_model_date};
use autoloan_models::{
    LoanApplication, LoanApplicationForm, LoanApplicationPatch, LoanStatus, StatusUpdateDto,
    TransitionDto,
};

use super::service::LoanApplicationService;
use crate::attachments::{MultipartForm, read_multipart};
use crate::middleware::auth::AuthUser;
use crate::middleware::role::{RequireAdmin, RequireApplicant};
use crate::modules::parse_id;
use crate::state::AppState;
use crate::validator::{ValidatedJson, json_rejection_message};

fn not_multipart(_: MultipartRejection) -> AppError {
    AppError::bad_request(anyhow!("Expected a multipart/form-data body"))
}

fn form_amount(form: &MultipartForm, key: &str, label: &str) -> Result<Option<f64>, AppError> {
    form.text(key).map(|raw| parse_amount(label, raw)).transpose()
}

/// Text parts of a submission, keyed by their JSON names.
fn application_form(form: &MultipartForm) -> Result<LoanApplicationForm, AppError> {
    Ok(LoanApplicationForm {
        loan_type: form.text("loanType").map(str::to_string),
        income: form_amount(form, "income", "Income")?,
        model: form.text("model").map(parse_model_date).transpose()?,
        purchase_price: form_amount(form, "purchasePrice", "Purchase price")?,
        address: form.text("address").map(str::to_string),
        file: None,
    })
}

fn application_patch(form: &MultipartForm) -> Result<LoanApplicationPatch, AppError> {
    let loan_status = form
        .text("loanStatus")
        .map(|raw| {
            raw.parse::<i16>()
                .map_err(|_| AppError::bad_request(anyhow!("Loan status must be 0, 1 or 2")))
        })
        .transpose()?;

    Ok(LoanApplicationPatch {
        loan_type: form.text("loanType").map(str::to_string),
        income: form_amount(form, "income", "Income")?,
        model: form.text("model").map(parse_model_date).transpose()?,
        purchase_price: form_amount(form, "purchasePrice", "Purchase price")?,
        address: form.text("address").map(str::to_string),
        loan_status,
    })
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[utoipa::path(
    get,
    path = "/loanApplication",
    responses(
        (status = 200, description = "Every loan application, newest first", body = Vec<LoanApplication>),
        (status = 400, description = "Authentication failed", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn list_applications(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<LoanApplication>>, AppError> {
    Ok(Json(LoanApplicationService::list_all(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/loanApplication/user",
    responses(
        (status = 200, description = "The caller's own applications, newest first", body = Vec<LoanApplication>),
        (status = 400, description = "Authentication failed", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn list_my_applications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<LoanApplication>>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(
        LoanApplicationService::list_by_applicant(&state.db, user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/loanApplication/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Loan application", body = LoanApplication),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "Cannot find any loan", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn get_application(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<LoanApplication>, AppError> {
    let id = parse_id(&id)?;
    let application = LoanApplicationService::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Cannot find any loan")))?;

    if !auth_user.can_access(application.user_id) {
        return Err(AppError::access_denied());
    }

    Ok(Json(application))
}

/// Submit an application with its supporting document (multipart field `file`)
#[utoipa::path(
    post,
    path = "/loanApplication",
    request_body(content_type = "multipart/form-data", description = "loanType, income, model, purchasePrice, address and file"),
    responses(
        (status = 200, description = "Added Successfully", body = MessageResponse),
        (status = 400, description = "Validation error or rejected upload", body = MessageResponse),
        (status = 403, description = "Only applicants may apply", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn create_application(
    State(state): State<AppState>,
    RequireApplicant(applicant): RequireApplicant,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let multipart = multipart.map_err(not_multipart)?;
    let upload = read_multipart(multipart, &state.upload_policy()).await?;
    let form = application_form(&upload)?;

    let Some(file) = upload.file else {
        return Err(form.into_fields().err().unwrap_or_else(|| {
            AppError::bad_request(anyhow!("File path or name is required"))
        }));
    };

    LoanApplicationService::create(
        &state.db,
        state.storage.as_ref(),
        applicant.user_id()?,
        form,
        file,
    )
    .await?;

    Ok(Json(MessageResponse::new("Added Successfully")))
}

/// Edit an application.
///
/// Applicants send their changes as multipart (optionally with a new `file`) or
/// JSON. Admins may send `{"loanStatus": n}` to set the status.
#[utoipa::path(
    put,
    path = "/loanApplication/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan application ID")),
    request_body = LoanApplicationPatch,
    responses(
        (status = 200, description = "Loan application updated successfully", body = MessageResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 403, description = "Not allowed to make this change", body = MessageResponse),
        (status = 404, description = "Loan application not found", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn update_application(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    req: Request,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;

    let (patch, new_file) = if is_multipart(&req) {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(not_multipart)?;
        let upload = read_multipart(multipart, &state.upload_policy()).await?;
        (application_patch(&upload)?, upload.file)
    } else {
        let Json(patch) = Json::<LoanApplicationPatch>::from_request(req, &state)
            .await
            .map_err(|rejection| AppError::bad_request(anyhow!(json_rejection_message(&rejection))))?;
        (patch, None)
    };

    if let Some(code) = patch.loan_status {
        if !auth_user.is_admin() {
            return Err(AppError::access_denied());
        }
        if patch.has_field_changes() || new_file.is_some() {
            return Err(AppError::bad_request(anyhow!(
                "Loan status cannot be changed together with other fields"
            )));
        }
        let status = LoanStatus::try_from(code)?;
        LoanApplicationService::force_status(&state.db, id, status).await?;
        return Ok(Json(MessageResponse::new(
            "Loan application updated successfully",
        )));
    }

    LoanApplicationService::update_fields(
        &state.db,
        state.storage.as_ref(),
        &state.cleanup,
        id,
        auth_user.user_id()?,
        patch,
        new_file,
    )
    .await?;

    Ok(Json(MessageResponse::new(
        "Loan application updated successfully",
    )))
}

/// Set the status to any value, regardless of the current one
#[utoipa::path(
    put,
    path = "/loanApplication/{id}/status",
    params(("id" = uuid::Uuid, Path, description = "Loan application ID")),
    request_body = StatusUpdateDto,
    responses(
        (status = 200, description = "Updated application", body = LoanApplication),
        (status = 400, description = "Loan status must be 0, 1 or 2", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse),
        (status = 404, description = "Loan application not found", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(dto): ValidatedJson<StatusUpdateDto>,
) -> Result<Json<LoanApplication>, AppError> {
    let id = parse_id(&id)?;
    let code = dto
        .loan_status
        .ok_or_else(|| AppError::bad_request(anyhow!("Loan status is required")))?;
    let status = LoanStatus::try_from(code)?;

    Ok(Json(
        LoanApplicationService::force_status(&state.db, id, status).await?,
    ))
}

/// Move the status along an allowed edge, only if it still equals `from`
#[utoipa::path(
    post,
    path = "/loanApplication/{id}/transition",
    params(("id" = uuid::Uuid, Path, description = "Loan application ID")),
    request_body = TransitionDto,
    responses(
        (status = 200, description = "Updated application", body = LoanApplication),
        (status = 400, description = "Transition not allowed", body = MessageResponse),
        (status = 403, description = "Access denied: Insufficient permissions", body = MessageResponse),
        (status = 404, description = "Loan application not found", body = MessageResponse),
        (status = 409, description = "Status changed since it was read", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn transition_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(dto): ValidatedJson<TransitionDto>,
) -> Result<Json<LoanApplication>, AppError> {
    let id = parse_id(&id)?;
    let (Some(from), Some(to)) = (dto.from, dto.to) else {
        return Err(AppError::bad_request(anyhow!("Current status is required")));
    };

    let application = LoanApplicationService::transition(
        &state.db,
        id,
        LoanStatus::try_from(from)?,
        LoanStatus::try_from(to)?,
    )
    .await?;

    Ok(Json(application))
}

#[utoipa::path(
    delete,
    path = "/loanApplication/{id}",
    params(("id" = uuid::Uuid, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Loan application and associated file deleted successfully", body = MessageResponse),
        (status = 403, description = "Not the owner", body = MessageResponse),
        (status = 404, description = "Loan application not found", body = MessageResponse)
    ),
    tag = "Loan Applications",
    security(("bearer_auth" = []))
)]
pub async fn delete_application(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    LoanApplicationService::delete(&state.db, &state.cleanup, id, &auth_user).await?;

    Ok(Json(MessageResponse::new(
        "Loan application and associated file deleted successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn form_with(pairs: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            file: None,
        }
    }

    #[test]
    fn test_application_form_reads_camel_case_fields() {
        let form = application_form(&form_with(&[
            ("loanType", "Car Loan"),
            ("income", "50000"),
            ("model", "2022-01-01"),
            ("purchasePrice", "20000"),
            ("address", "123 Main Street, City"),
        ]))
        .unwrap();

        assert_eq!(form.loan_type.as_deref(), Some("Car Loan"));
        assert_eq!(form.income, Some(50000.0));
        assert_eq!(form.purchase_price, Some(20000.0));
        assert!(form.file.is_none());
    }

    #[test]
    fn test_non_numeric_income_is_rejected() {
        let err = application_form(&form_with(&[("income", "lots")])).unwrap_err();
        assert_eq!(err.message(), "Income must be a number");
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let form = application_form(&form_with(&[("loanType", "   ")])).unwrap();
        assert!(form.loan_type.is_none());
    }

    #[test]
    fn test_patch_from_multipart() {
        let patch = application_patch(&form_with(&[("address", "456 Elm Street, Town")])).unwrap();
        assert!(patch.has_field_changes());
        assert!(patch.loan_status.is_none());

        let patch = application_patch(&form_with(&[("loanStatus", "2")])).unwrap();
        assert_eq!(patch.loan_status, Some(2));
        assert!(!patch.has_field_changes());

        assert!(application_patch(&form_with(&[("loanStatus", "approved")])).is_err());
    }
}
