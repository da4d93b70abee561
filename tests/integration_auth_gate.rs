mod common;

use autoloan::autoloan_auth::{UserRole, issue_token_at};
use autoloan::router::init_router;
use axum::http::StatusCode;
use chrono::Utc;
use common::{
    body_json, get_request, json_request, lazy_pool, test_jwt_config, test_state, token_for,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

fn setup_test_app() -> axum::Router {
    init_router(test_state(lazy_pool(), 5 * 1024 * 1024))
}

async fn assert_authentication_failed(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Authentication failed");
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let app = setup_test_app();
    let response = app
        .oneshot(get_request("/loanApplication", None))
        .await
        .unwrap();

    assert_authentication_failed(response).await;
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = setup_test_app();
    let response = app
        .oneshot(get_request("/loans", Some("definitely-not-a-token")))
        .await
        .unwrap();

    assert_authentication_failed(response).await;
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = setup_test_app();
    let token = issue_token_at(
        Uuid::new_v4(),
        UserRole::Admin,
        Utc::now().timestamp() - 7200,
        &test_jwt_config(),
    )
    .unwrap();

    let response = app
        .oneshot(get_request("/loanApplication/user", Some(&token)))
        .await
        .unwrap();

    assert_authentication_failed(response).await;
}

#[tokio::test]
async fn test_uploads_require_token_by_default() {
    let app = setup_test_app();
    let response = app
        .oneshot(get_request("/uploads/file-1700000000000-0a1b2c3d4e5f6789.pdf", None))
        .await
        .unwrap();

    assert_authentication_failed(response).await;
}

#[tokio::test]
async fn test_applicant_cannot_create_loan() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Applicant);

    let response = app
        .oneshot(json_request(
            "POST",
            "/loans",
            Some(&token),
            json!({
                "loanType": "Car Loan",
                "description": "New and used cars",
                "interestRate": 7.5,
                "maximumAmount": 50000
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Access denied: Insufficient permissions");
}

#[tokio::test]
async fn test_applicant_cannot_list_all_applications() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Applicant);

    let response = app
        .oneshot(get_request("/loanApplication", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_cannot_submit_application() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Admin);

    let response = app
        .oneshot(common::multipart_request(
            "POST",
            "/loanApplication",
            &token,
            common::multipart_body(&common::valid_application_fields(), None),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_applicant_cannot_set_status() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Applicant);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/loanApplication/{}", Uuid::new_v4()),
            Some(&token),
            json!({ "loanStatus": 1 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_status_cannot_be_combined_with_field_edits() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Admin);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/loanApplication/{}", Uuid::new_v4()),
            Some(&token),
            json!({ "loanStatus": 1, "income": 90000 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Loan status cannot be changed together with other fields"
    );
}

#[tokio::test]
async fn test_invalid_id_is_bad_request() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Admin);

    let response = app
        .oneshot(get_request("/loanApplication/not-a-uuid", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid id: not-a-uuid");
}

#[tokio::test]
async fn test_disallowed_transition_is_rejected_before_lookup() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Admin);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/loanApplication/{}/transition", Uuid::new_v4()),
            Some(&token),
            json!({ "from": 1, "to": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "Cannot change loan status from Approved to Pending"
    );
}

#[tokio::test]
async fn test_out_of_range_status_is_rejected() {
    let app = setup_test_app();
    let token = token_for(Uuid::new_v4(), UserRole::Admin);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/loanApplication/{}/status", Uuid::new_v4()),
            Some(&token),
            json!({ "loanStatus": 7 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
