//! Token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying `{sub, role, iat, exp}`. The header names the
//! signing key (`kid`) so that keys can be rotated: verification looks the key
//! up by id among the current and previous keys of [`JwtConfig`].
//!
//! Verification failures are reported as a tagged [`AuthFailure`] so they can be
//! logged and counted, but they all collapse to the same client-facing
//! "Authentication failed" response.

use anyhow::anyhow;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use thiserror::Error;
use uuid::Uuid;

use autoloan_config::JwtConfig;
use autoloan_config::jwt::TOKEN_TTL_SECS;
use autoloan_core::AppError;

use crate::claims::{Claims, UserRole};

/// Why a request could not be authenticated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("no bearer token in the Authorization header")]
    NoHeader,

    #[error("token is not a decodable JWT")]
    Malformed,

    #[error("token signature does not match any accepted key")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

impl AuthFailure {
    /// Label used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::NoHeader => "no_header",
            AuthFailure::Malformed => "malformed",
            AuthFailure::BadSignature => "bad_signature",
            AuthFailure::Expired => "expired",
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(_: AuthFailure) -> Self {
        AppError::authentication_failed()
    }
}

#[derive(Debug, Error)]
#[error("Failed to create token: {0}")]
pub struct TokenIssueError(#[from] jsonwebtoken::errors::Error);

impl From<TokenIssueError> for AppError {
    fn from(err: TokenIssueError) -> Self {
        AppError::internal(anyhow!(err.to_string()))
    }
}

/// Issues a one-hour token for `user_id` signed with the current key.
///
/// # Errors
///
/// Returns an error only if encoding fails, which does not happen with an HMAC key.
pub fn issue_token(
    user_id: Uuid,
    role: UserRole,
    jwt_config: &JwtConfig,
) -> Result<String, TokenIssueError> {
    issue_token_at(user_id, role, Utc::now().timestamp(), jwt_config)
}

/// Issues a token as if it had been issued at `issued_at` (Unix seconds).
pub fn issue_token_at(
    user_id: Uuid,
    role: UserRole,
    issued_at: i64,
    jwt_config: &JwtConfig,
) -> Result<String, TokenIssueError> {
    let iat = issued_at.max(0) as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat,
        exp: iat + TOKEN_TTL_SECS as usize,
    };

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(jwt_config.current.kid.clone());

    Ok(encode(
        &header,
        &claims,
        &EncodingKey::from_secret(jwt_config.current.secret.as_bytes()),
    )?)
}

/// Verifies signature and expiry (no leeway) and returns the identity claim.
///
/// Tokens without a `kid` are checked against the current key.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AuthFailure> {
    let header = decode_header(token).map_err(|_| AuthFailure::Malformed)?;

    let kid = header
        .kid
        .as_deref()
        .unwrap_or(jwt_config.current.kid.as_str());
    let secret = jwt_config
        .secret_for(kid)
        .ok_or(AuthFailure::BadSignature)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthFailure::BadSignature,
        _ => AuthFailure::Malformed,
    })
}
