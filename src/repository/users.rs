//! Users repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use super::{conflict_on_unique, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        user::{Role, User, UserRow},
        Book,
    },
};

pub const USER_NOT_FOUND: &str = "User not found";

/// A book joined with the user holding (or having returned) it
#[derive(Debug, FromRow)]
struct AssociatedBookRow {
    owner_id: i32,
    #[sqlx(flatten)]
    book: Book,
}

/// Association tables linking users to books
#[derive(Debug, Clone, Copy)]
enum Association {
    Taken,
    Returned,
}

impl Association {
    fn table(&self) -> &'static str {
        match self {
            Association::Taken => "user_taken",
            Association::Returned => "user_returned",
        }
    }
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Books associated with one user
    async fn books_for(&self, user_id: i32, association: Association) -> AppResult<Vec<Book>> {
        let query = format!(
            r#"
            SELECT b.* FROM books b
            JOIN {} a ON a.book_id = b.id
            WHERE a.user_id = $1
            ORDER BY b.isbn
            "#,
            association.table()
        );

        let books = sqlx::query_as::<_, Book>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Books associated with every user, grouped by user id
    async fn books_by_user(&self, association: Association) -> AppResult<HashMap<i32, Vec<Book>>> {
        let query = format!(
            r#"
            SELECT a.user_id AS owner_id, b.* FROM books b
            JOIN {} a ON a.book_id = b.id
            ORDER BY b.isbn
            "#,
            association.table()
        );

        let rows = sqlx::query_as::<_, AssociatedBookRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i32, Vec<Book>> = HashMap::new();
        for row in rows {
            grouped.entry(row.owner_id).or_default().push(row.book);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY email")
            .fetch_all(&self.pool)
            .await?;

        let mut taken = self.books_by_user(Association::Taken).await?;
        let mut returned = self.books_by_user(Association::Returned).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_user(
                    taken.remove(&id).unwrap_or_default(),
                    returned.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        let taken = self.books_for(row.id, Association::Taken).await?;
        let returned = self.books_for(row.id, Association::Returned).await?;

        Ok(row.into_user(taken, returned))
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create(&self, email: &str, password_hash: &str, role: Role) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "this user already exists"))?;

        Ok(row.into_user(Vec::new(), Vec::new()))
    }
}
