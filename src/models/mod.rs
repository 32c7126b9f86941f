//! Data models for the library server

pub mod auth;
pub mod book;
pub mod user;

// Re-export commonly used types
pub use auth::{AuthDetails, AuthSession};
pub use book::{Book, CreateBook};
pub use user::{Role, User};
