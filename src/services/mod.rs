//! Business logic services

pub mod auth;
pub mod catalog;
pub mod lending;
pub mod tokens;
pub mod users;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub tokens: tokens::TokenService,
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: &AuthConfig) -> Self {
        let tokens = tokens::TokenService::new(auth_config);
        Self {
            auth: auth::AuthService::new(repository.clone(), tokens.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            lending: lending::LendingService::new(repository),
            tokens,
        }
    }
}
