//! Login and token checks on admin routes.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;

use vitrine_integration_tests::{ADMIN_PASSWORD, JWT_SECRET, TestApp, json_request};
use vitrine_server::services::auth::Claims;

#[tokio::test]
async fn test_login_returns_token_and_profile() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            &json!({"username": "admin", "password": ADMIN_PASSWORD}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["name"], "Administrador");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
async fn test_login_token_opens_me() {
    let app = TestApp::new().await;
    let (_, body) = app
        .post(
            "/api/auth/login",
            &json!({"username": "admin", "password": ADMIN_PASSWORD}),
        )
        .await;
    let token = body["token"].as_str().unwrap();

    let (status, me) = app
        .send(json_request(Method::GET, "/api/auth/me", None, Some(token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            &json!({"username": "admin", "password": "not-the-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");

    // Unknown users get the same answer
    let (status, body) = app
        .post(
            "/api/auth/login",
            &json!({"username": "ghost", "password": ADMIN_PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/api/auth/login", &json!({"username": "admin"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "username and password are required");
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::new().await;
    let wrong = json!({"username": "admin", "password": "nope"});

    for _ in 0..5 {
        let (status, _) = app.post("/api/auth/login", &wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = app.post("/api/auth/login", &wrong).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_admin_route_without_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing token");

    let (status, _) = app
        .post("/api/products", &json!({"name": "Vestido", "price": 10}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_with_bad_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(json_request(
            Method::GET,
            "/api/auth/me",
            None,
            Some("not.a.token"),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");
}

#[tokio::test]
async fn test_admin_route_with_expired_token() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let issued = Utc::now().timestamp() - 7200;
    let claims = Claims {
        sub: admin.id,
        username: admin.username.clone(),
        role: admin.role,
        iat: issued,
        exp: issued + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let (status, body) = app
        .send(json_request(Method::GET, "/api/auth/me", None, Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token expired");
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let app = TestApp::new().await;
    let admin = app.admin().await;

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: admin.id,
        username: admin.username.clone(),
        role: admin.role,
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret-entirely-32byte"),
    )
    .unwrap();

    let (status, _) = app
        .send(json_request(Method::GET, "/api/auth/me", None, Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
