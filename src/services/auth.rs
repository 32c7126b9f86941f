//! Registration, login and logout

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::HeaderMap;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::LoginResponse,
        user::{LoginRequest, RegisterRequest},
        AuthDetails, AuthSession, Role, User,
    },
    repository::Repository,
    services::tokens::TokenService,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(repository: Repository, tokens: TokenService) -> Self {
        Self { repository, tokens }
    }

    /// Register a new account. Registered accounts always get the `User` role.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict("this user already exists".to_string()));
        }

        let password = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.email, &password, Role::User)
            .await?;

        tracing::info!(user_id = user.id, "Registered user {}", user.email);
        Ok(user)
    }

    /// Check credentials, open a session and sign a token for it
    pub async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let user = match self.repository.users.get_by_email(&request.email).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                tracing::warn!("Login attempt for unknown email {}", request.email);
                return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
            Err(e) => return Err(e),
        };

        if !verify_password(&user, &request.password)? {
            tracing::warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        // Every login gets its own session row; earlier sessions stay valid
        let session = self.repository.auths.create_auth(user.id, user.role).await?;

        let token = match self.tokens.create_token(&session.details()) {
            Ok(token) => token,
            Err(e) => {
                if let Err(cleanup) = self.repository.auths.delete_auth(&session.details()).await {
                    tracing::error!("Failed to drop unsigned session: {}", cleanup);
                }
                return Err(e.into());
            }
        };

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_seconds(),
        })
    }

    /// Close the session named by the request's token
    pub async fn logout(&self, headers: &HeaderMap) -> AppResult<AuthDetails> {
        let details = self
            .tokens
            .extract_token_auth(headers)
            .map_err(|_| AppError::Authentication("unauthorized".to_string()))?;

        match self.repository.auths.delete_auth(&details).await {
            Ok(()) => {
                tracing::info!(user_id = details.user_id, "User logged out");
                Ok(details)
            }
            Err(AppError::NotFound(_)) => {
                tracing::debug!(user_id = details.user_id, "Logout for a closed session");
                Err(AppError::Authentication("unauthorized".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Close every session of the caller
    pub async fn logout_all(&self, details: &AuthDetails) -> AppResult<u64> {
        let closed = self.repository.auths.delete_all_for_user(details.user_id).await?;
        tracing::info!(user_id = details.user_id, closed, "Closed all sessions");
        Ok(closed)
    }

    /// Look up the session a token claims, `NotFound` once it has been closed
    pub async fn fetch_session(&self, details: &AuthDetails) -> AppResult<AuthSession> {
        self.repository.auths.fetch_auth(details).await
    }

    /// Create the configured administrator account if it does not exist yet
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<()> {
        match self.repository.users.get_by_email(email).await {
            Ok(user) if user.role == Role::Admin => Ok(()),
            Ok(_) => {
                tracing::warn!("Configured admin {} exists without the Admin role", email);
                Ok(())
            }
            Err(AppError::NotFound(_)) => {
                let hash = hash_password(password)?;
                self.repository.users.create(email, &hash, Role::Admin).await?;
                tracing::info!("Created administrator account {}", email);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Verify user password
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
