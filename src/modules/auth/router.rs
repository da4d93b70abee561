use axum::{Router, routing::post};

use super::controller::{forgot_password, login, reset_password, signup};
use crate::state::AppState;

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}
