//! User lookup service

use crate::{error::AppResult, models::User, repository::Repository};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All users with their taken and returned books
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<User> {
        self.repository.users.get_by_email(email).await
    }
}
