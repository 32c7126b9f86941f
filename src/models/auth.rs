//! Authentication session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::Role;

/// One row of the `auths` table: an active login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuthSession {
    pub id: i32,
    pub user_id: i32,
    pub auth_uuid: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn details(&self) -> AuthDetails {
        AuthDetails {
            auth_uuid: self.auth_uuid,
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Session descriptor carried by a bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDetails {
    pub auth_uuid: Uuid,
    pub user_id: i32,
    pub role: Role,
}

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
