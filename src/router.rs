use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

use autoloan_config::CorsConfig;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::auth::authenticate;
use crate::middleware::role::require_any_role;
use crate::modules::auth::router::init_auth_router;
use crate::modules::loan_applications::router::init_loan_applications_router;
use crate::modules::loans::router::init_loans_router;
use crate::modules::uploads::router::init_uploads_router;
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    let body_limit = state.upload_policy().body_limit();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health))
        .merge(init_auth_router())
        .nest(
            "/loans",
            init_loans_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), require_any_role))
                .route_layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        )
        .nest(
            "/loanApplication",
            init_loan_applications_router()
                .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .nest("/uploads", init_uploads_router(&state))
        .with_state(state.clone())
        .layer(cors_layer(&state.cors_config))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
