//! User and lending endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{auth::MessageResponse, User},
    AppState,
};

use super::{AuthenticatedUser, RequireUser};

/// List users with their taken and returned books
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(_details): AuthenticatedUser,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

/// Get a user by email
#[utoipa::path(
    get,
    path = "/users/{email}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("email" = String, Path, description = "User email")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(_details): AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_by_email(&email).await?;
    Ok(Json(user))
}

/// Take one unit of a book
#[utoipa::path(
    post,
    path = "/users/{email}/{isbn}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("email" = String, Path, description = "Borrower email"),
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 201, description = "Book taken", body = MessageResponse),
        (status = 400, description = "No units left or book already taken"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "User role required"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn take_book(
    State(state): State<AppState>,
    _user: RequireUser,
    Path((email, isbn)): Path<(String, String)>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.lending.take_book(&email, &isbn).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Book successfully taken")),
    ))
}

/// Return a held book
#[utoipa::path(
    delete,
    path = "/users/{email}/{isbn}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("email" = String, Path, description = "Borrower email"),
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 204, description = "Book returned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "User role required"),
        (status = 404, description = "Book is not taken by this user")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    _user: RequireUser,
    Path((email, isbn)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.services.lending.return_book(&email, &isbn).await?;
    Ok(StatusCode::NO_CONTENT)
}
