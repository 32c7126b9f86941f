//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::book::Book;

/// Account role. Compared by exact equality, there is no hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "User" => Ok(Role::User),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as text)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Internal row structure for the `users` table
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Attach the taken/returned association lists
    pub fn into_user(self, taken_books: Vec<Book>, returned_books: Vec<Book>) -> User {
        User {
            id: self.id,
            email: self.email,
            password: self.password,
            role: self.role,
            taken_books,
            returned_books,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Full user model with current and historical book custody
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    /// Books currently held by the user
    pub taken_books: Vec<Book>,
    /// Books the user has returned and not taken again since
    pub returned_books: Vec<Book>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_taken(&self, isbn: &str) -> bool {
        self.taken_books.iter().any(|b| b.isbn == isbn)
    }

    pub fn has_returned(&self, isbn: &str) -> bool {
        self.returned_books.iter().any(|b| b.isbn == isbn)
    }
}

/// Registration request. The role is always `User`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"), length(max = 100))]
    pub email: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str) -> Book {
        let now = Utc::now();
        Book {
            id: 1,
            isbn: isbn.to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            available_units: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_parsing_is_exact() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("User".parse::<Role>(), Ok(Role::User));
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
        assert_eq!(serde_json::from_str::<Role>("\"User\"").unwrap(), Role::User);
    }

    #[test]
    fn test_password_is_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: 1,
            email: "alice@example.com".to_string(),
            password: "$argon2id$secret".to_string(),
            role: Role::User,
            taken_books: vec![book("978-0441013593")],
            returned_books: vec![],
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(user.has_taken("978-0441013593"));
        assert!(!user.has_returned("978-0441013593"));
    }

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            email: "alice@example.com".into(),
            password: "pw123".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "alice".into(),
            password: "pw123".into(),
        };
        assert!(bad_email.validate().is_err());

        let short = RegisterRequest {
            email: "alice@example.com".into(),
            password: "pw".into(),
        };
        assert!(short.validate().is_err());
    }
}
