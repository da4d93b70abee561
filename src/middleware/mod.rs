//! Authentication and the role gate.
//!
//! 1. [`auth::authenticate`] runs as a route layer on every protected router. It
//!    verifies `Authorization: Bearer <token>` and stores an [`auth::AuthUser`] in
//!    the request extensions.
//! 2. Handlers take `AuthUser` (any role) or a [`role::RequireAdmin`] /
//!    [`role::RequireApplicant`] extractor; whole routers may instead be wrapped
//!    in [`role::require_admin`] / [`role::require_any_role`].
//!
//! ```ignore
//! async fn list_all(RequireAdmin(_admin): RequireAdmin) -> Result<Json<...>, AppError> {
//!     // Only admins get here; everyone else receives 403.
//! }
//! ```

pub mod auth;
pub mod role;
