//! Authentication endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        auth::{LoginResponse, MessageResponse},
        user::{LoginRequest, RegisterRequest},
    },
    AppState,
};

use super::{require_open_session, AuthenticatedUser, ValidatedJson};

/// Register a new account with the `User` role
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid email or password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.auth.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("registered successfully")),
    ))
}

/// Authenticate and receive a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Malformed request")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.auth.login(&request).await?;
    Ok(Json(response))
}

/// Close the session named by the bearer token
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing token or session already closed")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.logout(&headers).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

/// Close every session of the caller
#[utoipa::path(
    post,
    path = "/logout/all",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All sessions closed", body = MessageResponse),
        (status = 401, description = "Not authenticated or session already closed")
    )
)]
pub async fn logout_all(
    State(state): State<AppState>,
    AuthenticatedUser(details): AuthenticatedUser,
) -> AppResult<Json<MessageResponse>> {
    // A closed session must not be able to close the others
    require_open_session(&state, &details).await?;

    let closed = state.services.auth.logout_all(&details).await?;
    Ok(Json(MessageResponse::new(format!("Closed {} sessions", closed))))
}
