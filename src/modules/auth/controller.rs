use axum::Json;
use axum::extract::State;

use autoloan_core::{AppError, MessageResponse};
use autoloan_models::{
    ForgotPasswordDto, ForgotPasswordResponse, LoginDto, LoginResponse, ResetPasswordDto,
    SignupDto,
};

use super::service::AuthService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Login and receive a one-hour token
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 401, description = "Invalid email or password", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginDto>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = AuthService::login(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(response))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupDto,
    responses(
        (status = 200, description = "User added successfully", body = MessageResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 403, description = "Admin signup disabled", body = MessageResponse),
        (status = 409, description = "Username, email or mobile already registered", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SignupDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::signup(&state.db, dto, &state.signup_config).await?;
    Ok(Json(MessageResponse::new("User added successfully")))
}

/// Check that an account exists before a password reset
#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body = ForgotPasswordDto,
    responses(
        (status = 200, description = "Email verified", body = ForgotPasswordResponse),
        (status = 400, description = "Email is required", body = MessageResponse),
        (status = 404, description = "User not found with this email address", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordDto>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    let response = AuthService::forgot_password(&state.db, dto).await?;
    Ok(Json(response))
}

/// Set a new password
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordDto,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation error", body = MessageResponse),
        (status = 404, description = "User not found with this email address", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordDto>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::reset_password(&state.db, dto).await?;
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now login with your new password.",
    )))
}
