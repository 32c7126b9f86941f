//! Bearer token issuance and verification
//!
//! Tokens are HMAC-signed JWTs whose payload names a server-side session:
//! `{ auth_uuid, authorized, user_id, role, iat, exp }`. A token only proves
//! that the server issued it; whether the session is still open is decided by
//! the credential store.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, TokenData,
    Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    models::{AuthDetails, Role},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Longest accepted token lifetime, ten years
const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing or malformed authorization header")]
    Malformed,

    #[error("Invalid token")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Unexpected token claims: {0}")]
    ClaimDecode(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::MissingRequiredClaim(claim) => {
                TokenError::ClaimDecode(format!("missing required claim `{}`", claim))
            }
            _ => TokenError::InvalidSignature,
        }
    }
}

/// Claims written into issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub auth_uuid: String,
    pub authorized: bool,
    pub user_id: i32,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Verified but not yet interpreted token payload
pub type RawClaims = serde_json::Map<String, Value>;

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl_seconds: capped_ttl_seconds(config.jwt_expiration_hours),
        }
    }

    /// Token lifetime in seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a token for an open session
    pub fn create_token(&self, details: &AuthDetails) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            auth_uuid: details.auth_uuid.to_string(),
            authorized: true,
            user_id: details.user_id,
            role: details.role,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Pull the raw token out of `Authorization: Bearer <token>`
    pub fn extract_token(headers: &HeaderMap) -> Result<&str, TokenError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(TokenError::Malformed)?;

        let token = header.strip_prefix(BEARER_PREFIX).ok_or(TokenError::Malformed)?;
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(TokenError::Malformed);
        }
        Ok(token)
    }

    /// Check the signature and expiry of the request's token
    pub fn verify_token(&self, headers: &HeaderMap) -> Result<TokenData<RawClaims>, TokenError> {
        let token = Self::extract_token(headers)?;
        Ok(decode::<RawClaims>(token, &self.decoding_key, &self.validation)?)
    }

    /// Verify the token and map its claims to a session descriptor
    pub fn extract_token_auth(&self, headers: &HeaderMap) -> Result<AuthDetails, TokenError> {
        let data = self.verify_token(headers)?;
        details_from_claims(&data.claims)
    }

    /// Succeeds when the request carries a token this server signed
    pub fn token_valid(&self, headers: &HeaderMap) -> Result<(), TokenError> {
        self.verify_token(headers).map(|_| ())
    }
}

fn capped_ttl_seconds(hours: u64) -> i64 {
    if hours > MAX_TTL_HOURS {
        tracing::warn!("jwt_expiration_hours {} capped to {}", hours, MAX_TTL_HOURS);
    }
    (hours.min(MAX_TTL_HOURS) * 3600) as i64
}

fn details_from_claims(claims: &RawClaims) -> Result<AuthDetails, TokenError> {
    let authorized = claims
        .get("authorized")
        .and_then(Value::as_bool)
        .ok_or_else(|| TokenError::ClaimDecode("`authorized` must be a boolean".to_string()))?;
    if !authorized {
        return Err(TokenError::ClaimDecode("token is not authorized".to_string()));
    }

    let auth_uuid = claims
        .get("auth_uuid")
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::ClaimDecode("`auth_uuid` must be a string".to_string()))?;
    let auth_uuid = Uuid::parse_str(auth_uuid)
        .map_err(|e| TokenError::ClaimDecode(format!("`auth_uuid` is not a UUID: {}", e)))?;

    let user_id = claims
        .get("user_id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| TokenError::ClaimDecode("`user_id` must be an integer".to_string()))?;

    let role = claims
        .get("role")
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::ClaimDecode("`role` must be a string".to_string()))?
        .parse::<Role>()
        .map_err(TokenError::ClaimDecode)?;

    Ok(AuthDetails {
        auth_uuid,
        user_id,
        role,
    })
}
