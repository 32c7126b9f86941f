//! Auth session repository (the credential store)

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::AuthStore;
use crate::{
    error::{AppError, AppResult},
    models::{AuthDetails, AuthSession, Role},
};

#[derive(Clone)]
pub struct AuthsRepository {
    pool: Pool<Postgres>,
}

impl AuthsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for AuthsRepository {
    async fn create_auth(&self, user_id: i32, role: Role) -> AppResult<AuthSession> {
        let session = sqlx::query_as::<_, AuthSession>(
            r#"
            INSERT INTO auths (user_id, auth_uuid, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Uuid::new_v4())
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn fetch_auth(&self, details: &AuthDetails) -> AppResult<AuthSession> {
        sqlx::query_as::<_, AuthSession>("SELECT * FROM auths WHERE user_id = $1 AND auth_uuid = $2")
            .bind(details.user_id)
            .bind(details.auth_uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    async fn delete_auth(&self, details: &AuthDetails) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM auths WHERE user_id = $1 AND auth_uuid = $2")
            .bind(details.user_id)
            .bind(details.auth_uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auths WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
