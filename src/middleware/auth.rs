use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use autoloan_auth::{AuthFailure, Claims, UserRole, verify_token};
use autoloan_core::AppError;

use crate::metrics::track_auth_rejection;
use crate::state::AppState;

/// Verified identity of the caller, placed in request extensions by [`authenticate`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Get the user ID as UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0.user_id().ok_or_else(AppError::authentication_failed)
    }

    pub fn role(&self) -> UserRole {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// Admins see everything; applicants only what they own.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.0.user_id() == Some(owner_id)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively and anything after the token is ignored.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthFailure::NoHeader)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthFailure::NoHeader),
    }
}

fn identify(headers: &HeaderMap, state: &AppState) -> Result<Claims, AuthFailure> {
    let token = bearer_token(headers)?;
    let claims = verify_token(token, &state.jwt_config)?;
    // A token for a non-UUID subject cannot name an owner.
    if claims.user_id().is_none() {
        return Err(AuthFailure::Malformed);
    }
    Ok(claims)
}

fn reject(failure: AuthFailure, path: &str) -> AppError {
    warn!(reason = failure.reason(), path, "Authentication rejected");
    track_auth_rejection(failure.reason());
    failure.into()
}

/// Verifies the bearer token and attaches an [`AuthUser`] to the request.
///
/// Every failure answers 400 "Authentication failed"; the reason only reaches
/// logs and metrics.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match identify(req.headers(), &state) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser(claims));
            next.run(req).await
        }
        Err(failure) => reject(failure, req.uri().path()).into_response(),
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| reject(AuthFailure::NoHeader, parts.uri.path()))
    }
}
