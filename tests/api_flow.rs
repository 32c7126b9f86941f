//! In-process API tests against the in-memory backend

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    AppState,
};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-secret";
const ISBN: &str = "978-0441013593";

async fn app_with(strict_sessions: bool) -> Router {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;
    config.auth.jwt_secret = "integration-secret".to_string();
    config.auth.strict_sessions = strict_sessions;

    let state = AppState::new(config, Repository::in_memory());
    state
        .services
        .auth
        .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    api::router(state)
}

async fn app() -> Router {
    app_with(false).await
}

async fn send(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(format!("/library/api/v1{}", path));
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, email, password).await
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    body["token"].as_str().unwrap().to_string()
}

async fn add_book(app: &Router, admin: &str, units: i32) {
    let (status, body) = send(
        app,
        Method::POST,
        "/books",
        Some(admin),
        Some(json!({
            "isbn": ISBN,
            "title": "Dune",
            "author": "Frank Herbert",
            "available_units": units
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["available_units"], units);
}

#[tokio::test]
async fn test_register_login_and_lookup() {
    let app = app().await;
    let token = register_and_login(&app, "alice@example.com", "pw123").await;

    let (status, body) = send(&app, Method::GET, "/users/alice@example.com", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "User");
    assert!(body.get("password").is_none());

    let (status, body) = send(&app, Method::GET, "/users/alice@example.com", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You need to be authorized to access this route");
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let app = app().await;
    let user = register_and_login(&app, "alice@example.com", "pw123").await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(&app, Method::DELETE, "/books/XYZ", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "This route is forbidden for User");

    // No hierarchy: an admin cannot take books
    add_book(&app, &admin, 1).await;
    let path = format!("/users/{}/{}", ADMIN_EMAIL, ISBN);
    let (status, body) = send(&app, Method::POST, &path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "This route is forbidden for Admin");
}

#[tokio::test]
async fn test_logged_out_token_is_refused_by_role_routes() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(&app, Method::POST, "/logout", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    let (status, _) = send(&app, Method::DELETE, "/books/XYZ", Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::POST, "/logout", Some(&admin), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");

    // The plain gate only checks the signature unless sessions are strict
    let (status, _) = send(&app, Method::GET, "/books", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_strict_sessions_apply_to_plain_routes() {
    let app = app_with(true).await;
    let token = register_and_login(&app, "alice@example.com", "pw123").await;

    let (status, _) = send(&app, Method::GET, "/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_closes_other_sessions() {
    let app = app().await;
    let first = register_and_login(&app, "alice@example.com", "pw123").await;
    let second = login(&app, "alice@example.com", "pw123").await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    add_book(&app, &admin, 1).await;

    let (status, _) = send(&app, Method::POST, "/logout/all", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);

    let path = format!("/users/alice@example.com/{}", ISBN);
    let (status, _) = send(&app, Method::POST, &path, Some(&second), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_closed_session_cannot_logout_everywhere() {
    let app = app().await;
    let first = register_and_login(&app, "alice@example.com", "pw123").await;
    let second = login(&app, "alice@example.com", "pw123").await;

    let (status, _) = send(&app, Method::POST, "/logout", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/logout/all", Some(&first), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The second session survived
    let (status, body) = send(&app, Method::POST, "/logout", Some(&second), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");
}

#[tokio::test]
async fn test_take_and_return_flow() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let alice = register_and_login(&app, "alice@example.com", "pw123").await;
    let bob = register_and_login(&app, "bob@example.com", "pw123").await;
    add_book(&app, &admin, 1).await;

    let alice_path = format!("/users/alice@example.com/{}", ISBN);
    let (status, body) = send(&app, Method::POST, &alice_path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Book successfully taken");

    let (_, book) = send(&app, Method::GET, &format!("/books/{}", ISBN), Some(&alice), None).await;
    assert_eq!(book["available_units"], 0);

    let (status, body) = send(&app, Method::POST, &alice_path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BookAlreadyTaken");

    let bob_path = format!("/users/bob@example.com/{}", ISBN);
    let (status, body) = send(&app, Method::POST, &bob_path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NoAvailableUnits");

    let (status, body) = send(&app, Method::DELETE, &bob_path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "BookIsNotTaken");

    let (status, _) = send(&app, Method::DELETE, &alice_path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, user) = send(&app, Method::GET, "/users/alice@example.com", Some(&alice), None).await;
    assert_eq!(user["taken_books"].as_array().unwrap().len(), 0);
    assert_eq!(user["returned_books"][0]["isbn"], ISBN);
    assert_eq!(user["returned_books"][0]["available_units"], 1);
}

#[tokio::test]
async fn test_held_book_cannot_be_deleted() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let alice = register_and_login(&app, "alice@example.com", "pw123").await;
    add_book(&app, &admin, 2).await;

    let path = format!("/users/alice@example.com/{}", ISBN);
    let (status, _) = send(&app, Method::POST, &path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let book_path = format!("/books/{}", ISBN);
    let (status, body) = send(&app, Method::DELETE, &book_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BookAlreadyTaken");

    let (status, book) = send(&app, Method::GET, &book_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["available_units"], 1);

    send(&app, Method::DELETE, &path, Some(&alice), None).await;
    let (status, _) = send(&app, Method::DELETE, &book_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &book_path, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_records_conflict() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    add_book(&app, &admin, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/books",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "title": "Dune", "author": "Frank Herbert", "available_units": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Every book must have a unique ISBN!");

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "another" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unprocessable_bodies() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(&app, Method::POST, "/register", None, Some(json!({ "email": "x" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "pw123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "title": "Dune", "author": "Frank Herbert", "available_units": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = send(&app, Method::GET, "/books", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "memory");
}
