use axum::{
    Router,
    routing::{get, post, put},
};

use super::controller::{
    create_application, delete_application, get_application, list_applications,
    list_my_applications, set_status, transition_status, update_application,
};
use crate::state::AppState;

pub fn init_loan_applications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_applications).post(create_application))
        .route("/user", get(list_my_applications))
        .route(
            "/{id}",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/{id}/status", put(set_status))
        .route("/{id}/transition", post(transition_status))
}
