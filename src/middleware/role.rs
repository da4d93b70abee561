//! Role gate.
//!
//! Two ways to restrict an operation to certain roles:
//! 1. Layer-based, with [`require_roles`] and its wrappers via `from_fn_with_state`
//! 2. Extractor-based, with [`RequireAdmin`] / [`RequireApplicant`]
//!
//! Both read the [`AuthUser`] attached by the auth middleware and never look at
//! the token. A request without one fails authentication, not authorization.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use autoloan_auth::UserRole;
use autoloan_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Succeeds if the caller's role is in `allowed_roles`.
pub fn authorize_roles(auth_user: &AuthUser, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    if allowed_roles.contains(&auth_user.role()) {
        return Ok(());
    }

    warn!(
        role = auth_user.role().as_str(),
        subject = %auth_user.0.sub,
        "Role gate denied request"
    );
    Err(AppError::access_denied())
}

/// Middleware that checks the authenticated user has one of the required roles.
///
/// ```rust,ignore
/// let admin_routes = Router::new()
///     .route("/", get(list_all))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         |state, req, next| require_roles(state, req, next, vec![UserRole::Admin]),
///     ));
/// ```
pub async fn require_roles(
    State(_state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: Vec<UserRole>,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let auth_user = AuthUser::from_request_parts(&mut parts, &()).await?;

    authorize_roles(&auth_user, &allowed_roles)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(State(state), req, next, vec![UserRole::Admin])
        .await
        .unwrap_or_else(|err| err.into_response())
}

/// Any authenticated role.
pub async fn require_any_role(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    require_roles(State(state), req, next, UserRole::ALL.to_vec())
        .await
        .unwrap_or_else(|err| err.into_response())
}

/// Extractor for admin-only handlers.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        authorize_roles(&auth_user, &[UserRole::Admin])?;
        Ok(RequireAdmin(auth_user))
    }
}

/// Extractor for applicant-only handlers.
#[derive(Debug, Clone)]
pub struct RequireApplicant(pub AuthUser);

impl<S> FromRequestParts<S> for RequireApplicant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        authorize_roles(&auth_user, &[UserRole::Applicant])?;
        Ok(RequireApplicant(auth_user))
    }
}
