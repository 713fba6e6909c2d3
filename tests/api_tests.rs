//! Router-level tests of the authorization contract. None of these touch a
//! live database: the fake state uses a lazily connecting pool, and every
//! request here is rejected (or answered) before a query would be issued.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use fintrack::{app::build_app, auth::token::TokenKeys, config::AuthStrategy, state::AppState};

fn token_app() -> Router {
    build_app(AppState::fake(AuthStrategy::Token))
}

fn session_app() -> Router {
    build_app(AppState::fake(AuthStrategy::Session))
}

/// Keys matching the fake state's JWT config.
fn test_keys() -> TokenKeys {
    TokenKeys::new(
        "test-secret",
        "test-issuer",
        "test-aud",
        Duration::from_secs(24 * 3600),
    )
}

fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("error responses are JSON")
}

#[tokio::test]
async fn health_is_open() {
    let response = token_app()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_endpoints_reject_missing_proof() {
    let id = Uuid::new_v4();
    let routes = [
        (Method::GET, "/api/transactions/my".to_string()),
        (Method::POST, "/api/transactions".to_string()),
        (Method::GET, format!("/api/transactions/{id}")),
        (Method::PUT, format!("/api/transactions/{id}")),
        (Method::DELETE, format!("/api/transactions/{id}")),
        (Method::GET, "/api/users/profile".to_string()),
    ];

    for (method, uri) in routes {
        let response = token_app()
            .oneshot(request(method.clone(), &uri, None, None))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} must require a proof"
        );
        let body = json_body(response).await;
        assert!(body["error"].is_string(), "{uri} must answer a JSON error");
    }
}

#[tokio::test]
async fn malformed_proofs_are_rejected() {
    for auth in ["Basic dXNlcjpwdw==", "Bearer not-a-jwt", "Bearer ", "nonsense"] {
        let response = token_app()
            .oneshot(request(
                Method::GET,
                "/api/transactions/my",
                Some(auth),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "auth header {auth:?} must be rejected"
        );
    }
}

#[tokio::test]
async fn expired_token_is_rejected() {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration as TimeDuration, OffsetDateTime};

    let now = OffsetDateTime::now_utc();
    let claims = fintrack::auth::token::Claims {
        sub: Uuid::new_v4(),
        iat: (now - TimeDuration::days(2)).unix_timestamp() as usize,
        exp: (now - TimeDuration::days(1)).unix_timestamp() as usize,
        iss: "test-issuer".into(),
        aud: "test-aud".into(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();

    let response = token_app()
        .oneshot(request(
            Method::GET,
            "/api/transactions/my",
            Some(&format!("Bearer {token}")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_deployment_ignores_bearer_tokens() {
    // A valid JWT is not an identity proof when sessions are the strategy.
    let token = test_keys().sign(Uuid::new_v4()).unwrap();
    let response = session_app()
        .oneshot(request(
            Method::GET,
            "/api/transactions/my",
            Some(&format!("Bearer {token}")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_deployment_rejects_missing_cookie() {
    let response = session_app()
        .oneshot(request(Method::GET, "/api/users/profile", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn signup_validates_before_touching_the_store() {
    let cases = [
        // username too short
        r#"{"username": "ab", "email": "ab@example.com", "password": "secret123"}"#,
        // username too long
        r#"{"username": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaax", "email": "ab@example.com", "password": "secret123"}"#,
        // malformed email
        r#"{"username": "alice", "email": "not-an-email", "password": "secret123"}"#,
        // password too short
        r#"{"username": "alice", "email": "alice@example.com", "password": "short"}"#,
    ];

    for body in cases {
        let response = token_app()
            .oneshot(request(
                Method::POST,
                "/api/users/signup",
                None,
                Some(body),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {body} must fail validation"
        );
        let parsed = json_body(response).await;
        assert!(parsed["error"].is_string());
    }
}

#[tokio::test]
async fn login_rejects_malformed_email_shape() {
    let response = token_app()
        .oneshot(request(
            Method::POST,
            "/api/users/login",
            None,
            Some(r#"{"email": "not-an-email", "password": "whatever1"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rejects_non_positive_amount() {
    // The proof is valid, so the request reaches the handler; the amount
    // check fires before any store access.
    let token = test_keys().sign(Uuid::new_v4()).unwrap();
    for body in [
        r#"{"type": "expense", "amount": 0}"#,
        r#"{"type": "expense", "amount": -5.5}"#,
    ] {
        let response = token_app()
            .oneshot(request(
                Method::POST,
                "/api/transactions",
                Some(&format!("Bearer {token}")),
                Some(body),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {body} must fail validation"
        );
    }
}

#[tokio::test]
async fn logout_is_open_and_acknowledges() {
    let response = token_app()
        .oneshot(request(Method::POST, "/api/users/logout", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "logged out");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let response = session_app()
        .oneshot(request(Method::POST, "/api/users/logout", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session logout sets a clearing cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("fintrack_session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}
