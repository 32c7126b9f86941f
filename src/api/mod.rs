//! API handlers for the library REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod users;

use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{AuthDetails, Role},
    AppState,
};

const NOT_AUTHORIZED: &str = "You need to be authorized to access this route";

/// Extractor for any caller holding a token this server signed
pub struct AuthenticatedUser(pub AuthDetails);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tokens = &state.services.tokens;

        let details = tokens
            .token_valid(&parts.headers)
            .and_then(|_| tokens.extract_token_auth(&parts.headers))
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                AppError::Authentication(NOT_AUTHORIZED.to_string())
            })?;

        if state.config.auth.strict_sessions {
            require_open_session(state, &details).await?;
        }

        Ok(AuthenticatedUser(details))
    }
}

/// Role a [`RequireRole`] extractor admits
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
}

pub struct AdminRole;

impl RequiredRole for AdminRole {
    const ROLE: Role = Role::Admin;
}

pub struct UserRole;

impl RequiredRole for UserRole {
    const ROLE: Role = Role::User;
}

/// Extractor for callers with an open session and exactly the role `R`.
/// Roles are not hierarchical: an admin token is refused on `User` routes.
pub struct RequireRole<R: RequiredRole>(pub AuthDetails, PhantomData<R>);

pub type RequireAdmin = RequireRole<AdminRole>;
pub type RequireUser = RequireRole<UserRole>;

#[async_trait]
impl<R: RequiredRole> FromRequestParts<AppState> for RequireRole<R> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tokens = &state.services.tokens;

        tokens
            .token_valid(&parts.headers)
            .map_err(|_| AppError::Authentication(NOT_AUTHORIZED.to_string()))?;
        let details = tokens.extract_token_auth(&parts.headers)?;

        // A verified signature is not enough once the session was logged out
        require_open_session(state, &details).await?;

        if details.role != R::ROLE {
            tracing::debug!(user_id = details.user_id, "Role {} refused", details.role);
            return Err(AppError::Authorization(format!(
                "This route is forbidden for {}",
                details.role
            )));
        }

        Ok(RequireRole(details, PhantomData))
    }
}

async fn require_open_session(state: &AppState, details: &AuthDetails) -> Result<(), AppError> {
    match state.services.auth.fetch_session(details).await {
        Ok(_) => Ok(()),
        Err(AppError::NotFound(_)) => Err(AppError::Authentication(NOT_AUTHORIZED.to_string())),
        Err(e) => Err(e),
    }
}

/// JSON body that has been deserialized and validated.
/// Both kinds of failure are reported as 422.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/logout/all", post(auth::logout_all))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/:isbn", get(books::get_book).delete(books::delete_book))
        // Users and lending
        .route("/users", get(users::list_users))
        .route("/users/:email", get(users::get_user))
        .route(
            "/users/:email/:isbn",
            post(users::take_book).delete(users::return_book),
        )
        .with_state(state);

    Router::new()
        .nest("/library/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
