use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use autoloan_auth::{UserRole, issue_token};
use autoloan_config::{JwtConfig, SignupConfig};
use autoloan_core::{AppError, hash_password, verify_password};
use autoloan_models::users::normalize_email;
use autoloan_models::{
    ForgotPasswordDto, ForgotPasswordResponse, LoginDto, LoginResponse, ResetPasswordDto,
    SignupDto, User, UserCredentials,
};

use crate::metrics::{track_login_failure, track_login_success, track_token_issued};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const USER_NOT_FOUND: &str = "User not found with this email address";

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, signup_config), fields(db.operation = "INSERT", db.table = "users"))]
    pub async fn signup(
        db: &PgPool,
        dto: SignupDto,
        signup_config: &SignupConfig,
    ) -> Result<User, AppError> {
        let role = dto
            .role()
            .ok_or_else(|| AppError::bad_request(anyhow!("Role must be either admin or applicant")))?;

        if role == UserRole::Admin && !signup_config.allow_admin_signup {
            warn!("Rejected admin signup");
            return Err(AppError::forbidden(anyhow!(
                "Admin accounts cannot be created through signup"
            )));
        }

        let (Some(username), Some(email), Some(mobile), Some(password)) =
            (dto.user_name, dto.email, dto.mobile, dto.password)
        else {
            return Err(AppError::bad_request(anyhow!("All fields are required")));
        };

        let hashed = hash_password(&password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, mobile, password, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, username, email, mobile, role, created_at",
        )
        .bind(&username)
        .bind(normalize_email(&email))
        .bind(&mobile)
        .bind(&hashed)
        .bind(role.as_str())
        .fetch_one(db)
        .await?;

        info!(user.id = %user.id, user.role = %user.role, "User registered");
        Ok(user)
    }

    #[instrument(skip(db, dto, jwt_config))]
    pub async fn login(
        db: &PgPool,
        dto: LoginDto,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let email = normalize_email(dto.email.as_deref().unwrap_or_default());
        let password = dto.password.unwrap_or_default();

        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, password, role FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            track_login_failure();
            return Err(AppError::unauthorized(anyhow!(INVALID_CREDENTIALS)));
        };

        if !verify_password(&password, &credentials.password)? {
            warn!(user.id = %credentials.id, "Login with wrong password");
            track_login_failure();
            return Err(AppError::unauthorized(anyhow!(INVALID_CREDENTIALS)));
        }

        let token = issue_token(credentials.id, credentials.role, jwt_config)?;
        track_token_issued();
        track_login_success(credentials.role.as_str());
        info!(user.id = %credentials.id, "User logged in");

        Ok(LoginResponse {
            user_name: credentials.username,
            role: credentials.role,
            token,
            id: credentials.id,
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn forgot_password(
        db: &PgPool,
        dto: ForgotPasswordDto,
    ) -> Result<ForgotPasswordResponse, AppError> {
        let email = dto.email.unwrap_or_default();

        sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(normalize_email(&email))
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!(USER_NOT_FOUND)))?;

        Ok(ForgotPasswordResponse {
            message: "Email verified successfully. You can now reset your password.".to_string(),
            email,
        })
    }

    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn reset_password(db: &PgPool, dto: ResetPasswordDto) -> Result<(), AppError> {
        let (Some(email), Some(new_password)) = (dto.email, dto.new_password) else {
            return Err(AppError::bad_request(anyhow!(
                "Email and new password are required"
            )));
        };

        let hashed = hash_password(&new_password)?;

        let result = sqlx::query(
            "UPDATE users SET password = $1, updated_at = NOW() WHERE email = $2",
        )
        .bind(&hashed)
        .bind(normalize_email(&email))
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!(USER_NOT_FOUND)));
        }

        info!("Password reset");
        Ok(())
    }
}
