use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Role};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-store-token", "store-1")
        .body(body.to_string())
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-store-token", "store-1")
        .body(String::new())
        .unwrap()
}

fn with_bearer(mut req: Request<String>, token: &str) -> Request<String> {
    req.headers_mut().insert(
        http::header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

const ADA: &str = r#"{"email":"ada@example.com","password":"password1","first_name":"Ada","last_name":"Lovelace"}"#;

// --- store credentials ---

#[tokio::test]
async fn missing_store_header_is_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/auth/roles").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Missing store credentials");
}

// --- roles ---

#[tokio::test]
async fn seeded_roles_are_enveloped() {
    let resp = app().oneshot(request("GET", "/api/auth/roles/1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let role: Role = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(role.name, "admin");
    assert!(role.is_system);
}

#[tokio::test]
async fn unknown_role_is_404_with_message() {
    let resp = app().oneshot(request("GET", "/api/auth/roles/99")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Role not found");
}

#[tokio::test]
async fn system_role_cannot_be_deleted() {
    let resp = app().oneshot(request("DELETE", "/api/auth/roles/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_role_rejects_unknown_permission() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/auth/roles",
            r#"{"name":"auditor","display_name":"Auditor","permissions":["audit.read"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert!(body["errors"]["permissions"].is_array());
}

#[tokio::test]
async fn roles_are_paginated() {
    let resp = app()
        .oneshot(request("GET", "/api/auth/roles?page=2&per_page=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let roles: Vec<Role> = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "member");
}

#[tokio::test]
async fn permissions_are_nested() {
    let resp = app().oneshot(request("GET", "/api/auth/permissions")).await.unwrap();
    let body: Value = body_json(resp).await;
    assert!(body["data"]["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("users.write")));
}

// --- users ---

#[tokio::test]
async fn register_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/register", ADA))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["roles"][0]["name"], "member");
}

#[tokio::test]
async fn register_invalid_input_returns_field_errors() {
    let resp = app()
        .oneshot(json_request("POST", "/api/auth/register", r#"{"email":"nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["email"], json!(["must be a valid email address"]));
}

#[tokio::test]
async fn unknown_email_lookup_is_404() {
    let resp = app()
        .oneshot(request("GET", "/api/auth/users/email/nobody@example.com"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn me_requires_session() {
    let resp = app().oneshot(request("GET", "/api/auth/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- session lifecycle ---

#[tokio::test]
async fn session_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // register
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/auth/register", ADA))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // duplicate register
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/auth/register", ADA))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["errors"]["email"], json!(["already taken"]));

    // wrong password
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/auth/login",
            r#"{"email":"ada@example.com","password":"wrong"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // login
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/auth/login",
            r#"{"email":"ada@example.com","password":"password1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");

    // me
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(with_bearer(request("GET", "/api/auth/me"), &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert!(body["data"]["last_login_at"].is_string());

    // profile
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(with_bearer(
            json_request("PATCH", "/api/auth/profile", r#"{"timezone":"UTC"}"#),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"]["timezone"], "UTC");
    assert_eq!(body["data"]["first_name"], "Ada"); // unchanged

    // logout
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(with_bearer(request("POST", "/api/auth/logout"), &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // me after logout
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(with_bearer(request("GET", "/api/auth/me"), &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
