//! Library catalog server
//!
//! A REST JSON API for a small lending library: a book catalog, user
//! accounts with `Admin`/`User` roles, session-backed bearer tokens, and
//! atomic take/return of book units.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services over a repository using the given configuration
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository, &config.auth);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
