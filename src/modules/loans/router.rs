use axum::{
    Router,
    routing::get,
};

use super::controller::{create_loan, delete_loan, get_loan, list_loans, update_loan};
use crate::state::AppState;

pub fn init_loans_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_loans).post(create_loan))
        .route("/{id}", get(get_loan).put(update_loan).delete(delete_loan))
}
