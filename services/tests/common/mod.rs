//! Shared test utilities for integration tests.
//!
//! - `TestApp` wires the router over the in-memory storages
//! - session tokens for the seeded users
//! - a small multipart body builder and PNG generator
//! - `send` for driving the router with `tower::ServiceExt::oneshot`

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use tower::ServiceExt;
use weterest_services::{
    config::Config,
    database::MockSqlStorage,
    routes,
    storage::MockFileStorage,
    users::{MockUserStorage, StoredUser, generate_session_token},
};

/// JWT secret configured by `Config::new_for_test`.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-local-development";

pub const ALICE_ID: i64 = 1;
pub const BOB_ID: i64 = 2;

const BOUNDARY: &str = "weterest-test-boundary";

/// Router plus handles on the storages behind it.
pub struct TestApp {
    pub router: Router,
    pub sql: MockSqlStorage,
    pub files: MockFileStorage,
}

impl TestApp {
    /// Seeded tags 1..=10 and two users, `alice` and `bob`.
    pub fn new() -> Self {
        Self::with_config(Config::new_for_test())
    }

    pub fn with_config(config: Config) -> Self {
        let sql = MockSqlStorage::new()
            .with_seed_tags(10)
            .with_user(ALICE_ID, "Alice", None)
            .with_user(BOB_ID, "Bob", Some("https://cdn.test/bob.png".to_owned()));
        let users = MockUserStorage::with_users([
            StoredUser::new(ALICE_ID, "alice", "Alice"),
            StoredUser::new(BOB_ID, "bob", "Bob").with_profile_image("https://cdn.test/bob.png"),
        ]);
        let files = MockFileStorage::new();

        let router = routes(sql.clone(), users, files.clone(), config);
        Self { router, sql, files }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        send(self.router.clone(), request).await
    }
}

pub fn token(username: &str) -> String {
    generate_session_token(username, TEST_JWT_SECRET).unwrap()
}

pub fn bearer(username: &str) -> String {
    format!("Bearer {}", token(username))
}

/// Sends one request and decodes the body as JSON (`Null` when empty or
/// not JSON).
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, username: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(username))
        .body(Body::empty())
        .unwrap()
}

pub fn json_as(
    method: &str,
    uri: &str,
    username: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(username))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Builds a `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, username: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(username))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A complete create-board form with a `width`x`height` PNG.
pub fn board_form(title: &str, width: u32, height: u32) -> MultipartForm {
    MultipartForm::new()
        .text("title", title)
        .text("description", "x")
        .text("source", "camera")
        .file("filename", "sunset.png", "image/png", &png(width, height))
}

/// Creates a board as `username` and returns the created summary.
pub async fn create_board(app: &TestApp, username: &str, title: &str) -> serde_json::Value {
    let (status, body) = app
        .send(board_form(title, 100, 50).into_request("/boards", username))
        .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body["board"].clone()
}
