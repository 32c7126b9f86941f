//! Loans repository: transactional take/return writes

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::LoanStore;
use crate::{
    error::{AppError, AppResult, LendingError},
    models::Book,
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn take(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: the last unit goes to whichever transaction commits first
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET available_units = available_units - 1, updated_at = NOW()
            WHERE id = $1 AND available_units > 0
            RETURNING *
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LendingError::NoAvailableUnits)?;

        let inserted = sqlx::query(
            "INSERT INTO user_taken (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(LendingError::BookAlreadyTaken.into());
        }

        sqlx::query("DELETE FROM user_returned WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(book)
    }

    async fn give_back(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM user_taken WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(LendingError::BookIsNotTaken.into());
        }

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET available_units = available_units + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        sqlx::query(
            "INSERT INTO user_returned (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }
}
