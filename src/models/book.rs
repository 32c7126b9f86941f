//! Book (catalog entry) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    /// Copies not currently held by any user
    pub available_units: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 32, message = "ISBN must be 1 to 32 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, max = 256, message = "Title must be 1 to 256 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: String,
    #[validate(range(min = 0, message = "Available units cannot be negative"))]
    pub available_units: i32,
}
