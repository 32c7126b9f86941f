//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, BookStore};
use crate::{
    error::{AppError, AppResult, LendingError},
    models::{Book, CreateBook},
};

pub const DUPLICATE_ISBN: &str = "Every book must have a unique ISBN!";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY isbn")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book with this isbn: {} does not exist", isbn)))
    }

    async fn isbn_exists(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (isbn, title, author, available_units)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.available_units)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_ISBN))
    }

    async fn is_taken(&self, isbn: &str) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_taken t
                JOIN books b ON b.id = t.book_id
                WHERE b.isbn = $1
            )
            "#,
        )
        .bind(isbn)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so a concurrent take cannot slip in between the check and the delete
        let book_id: i32 = sqlx::query_scalar("SELECT id FROM books WHERE isbn = $1 FOR UPDATE")
            .bind(isbn)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book with this isbn: {} does not exist", isbn)))?;

        let held: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_taken WHERE book_id = $1)")
            .bind(book_id)
            .fetch_one(&mut *tx)
            .await?;

        if held {
            return Err(LendingError::BookAlreadyTaken.into());
        }

        sqlx::query("DELETE FROM user_returned WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
