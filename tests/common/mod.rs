use std::path::PathBuf;

use autoloan::autoloan_auth::{UserRole, issue_token};
use autoloan::autoloan_config::{CorsConfig, JwtConfig, SignupConfig, UploadConfig};
use autoloan::autoloan_core::hash_password;
use autoloan::router::init_router;
use autoloan::state::AppState;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub const BOUNDARY: &str = "autoloan-test-boundary";

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[allow(dead_code)]
pub fn test_jwt_config() -> JwtConfig {
    JwtConfig::new("v1", "test-secret-key-at-least-32-characters-long").unwrap()
}

#[allow(dead_code)]
/// Fresh upload directory under the system temp dir.
pub fn test_upload_dir() -> PathBuf {
    std::env::temp_dir().join(format!("autoloan-test-{}", Uuid::new_v4()))
}

#[allow(dead_code)]
pub fn test_state(pool: PgPool, max_bytes: usize) -> AppState {
    AppState::new(
        pool,
        test_jwt_config(),
        CorsConfig::from_list("http://localhost:3000"),
        UploadConfig {
            dir: test_upload_dir(),
            max_bytes,
            public: false,
        },
        SignupConfig {
            allow_admin_signup: false,
        },
    )
}

/// Pool that never connects, for requests rejected before any query runs.
#[allow(dead_code)]
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap()
}

#[allow(dead_code)]
pub async fn setup_test_app(pool: PgPool) -> (Router, AppState) {
    setup_test_app_with_limit(pool, 5 * 1024 * 1024).await
}

#[allow(dead_code)]
pub async fn setup_test_app_with_limit(pool: PgPool, max_bytes: usize) -> (Router, AppState) {
    let state = test_state(pool, max_bytes);
    state.storage.prepare().await.unwrap();
    (init_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn token_for(user_id: Uuid, role: UserRole) -> String {
    issue_token(user_id, role, &test_jwt_config()).unwrap()
}

#[allow(dead_code)]
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Attachment part of a multipart body.
#[allow(dead_code)]
pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Encodes text fields followed by an optional `file` part.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", bearer(token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", bearer(token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", bearer(token));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn delete_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Ten digits derived from a fresh UUID, unique enough for one test database.
#[allow(dead_code)]
pub fn generate_unique_mobile() -> String {
    let n = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("{:010}", n)
}

#[allow(dead_code)]
pub fn generate_unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

#[allow(dead_code)]
pub async fn create_test_user(pool: &PgPool, role: UserRole) -> TestUser {
    let username = format!("user-{}", Uuid::new_v4());
    let email = generate_unique_email();
    let password = "testpass123".to_string();
    let hashed = hash_password(&password).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (username, email, mobile, password, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(&username)
    .bind(&email)
    .bind(generate_unique_mobile())
    .bind(&hashed)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser {
        id,
        username,
        email,
        password,
        role,
    }
}

/// Fields of a valid application form, in request order.
#[allow(dead_code)]
pub fn valid_application_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("loanType", "Car Loan"),
        ("income", "50000"),
        ("model", "2022-06-01"),
        ("purchasePrice", "25000"),
        ("address", "221B Baker Street, London"),
    ]
}

#[allow(dead_code)]
pub fn pdf_part(bytes: &[u8]) -> FilePart<'_> {
    FilePart {
        file_name: "payslip.pdf",
        content_type: "application/pdf",
        bytes,
    }
}
