use axum::{Router, middleware, routing::get};

use super::controller::{serve_public_upload, serve_upload};
use crate::middleware::auth::authenticate;
use crate::state::AppState;

pub fn init_uploads_router(state: &AppState) -> Router<AppState> {
    if state.upload_config.public {
        return Router::new().route("/{filename}", get(serve_public_upload));
    }

    Router::new()
        .route("/{filename}", get(serve_upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}
