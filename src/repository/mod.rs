//! Repository layer for database operations
//!
//! Each concern is a trait so the services can run against PostgreSQL or the
//! process-local [`memory::MemoryStore`].

pub mod auths;
pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{AuthDetails, AuthSession, Book, CreateBook, Role, User},
};

/// Catalog persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Round trip to the backing store
    async fn ping(&self) -> AppResult<()>;

    /// List every book ordered by ISBN
    async fn list(&self) -> AppResult<Vec<Book>>;

    /// Get a book by ISBN, `NotFound` if absent
    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book>;

    async fn isbn_exists(&self, isbn: &str) -> AppResult<bool>;

    /// Insert a book, `Conflict` on a duplicate ISBN
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    /// Whether any user currently holds the book
    async fn is_taken(&self, isbn: &str) -> AppResult<bool>;

    /// Delete a book that nobody holds, clearing its returned associations
    async fn delete(&self, isbn: &str) -> AppResult<()>;
}

/// User persistence, including the taken/returned association lists
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Get a user by email, `NotFound` if absent
    async fn get_by_email(&self, email: &str) -> AppResult<User>;

    async fn email_exists(&self, email: &str) -> AppResult<bool>;

    /// Insert a user, `Conflict` on a duplicate email
    async fn create(&self, email: &str, password_hash: &str, role: Role) -> AppResult<User>;
}

/// Active login sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Record a new session with a fresh random identifier
    async fn create_auth(&self, user_id: i32, role: Role) -> AppResult<AuthSession>;

    /// Exact `(user_id, auth_uuid)` lookup, `NotFound` when revoked
    async fn fetch_auth(&self, details: &AuthDetails) -> AppResult<AuthSession>;

    /// Remove one session, `NotFound` when already gone
    async fn delete_auth(&self, details: &AuthDetails) -> AppResult<()>;

    /// Remove every session of a user, returning how many were removed
    async fn delete_all_for_user(&self, user_id: i32) -> AppResult<u64>;
}

/// Atomic take/return writes. Each call either applies the unit count and
/// both association lists together or changes nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Decrement units, add to taken, drop from returned. Returns the updated book.
    async fn take(&self, user_id: i32, book_id: i32) -> AppResult<Book>;

    /// Drop from taken, increment units, add to returned. Returns the updated book.
    async fn give_back(&self, user_id: i32, book_id: i32) -> AppResult<Book>;
}

/// Main repository struct holding one store per concern
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub auths: Arc<dyn AuthStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            auths: Arc::new(auths::AuthsRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create a repository backed by a single shared in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            books: store.clone(),
            users: store.clone(),
            auths: store.clone(),
            loans: store,
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> crate::error::AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::error::AppError::Conflict(message.to_string())
        }
        _ => crate::error::AppError::Database(e),
    }
}
