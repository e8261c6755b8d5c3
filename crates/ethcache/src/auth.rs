//! Credential verification and JWT session tokens.
//!
//! Passwords are stored as Argon2id PHC strings and verified with the
//! `argon2` crate. Session tokens are HS256 JWTs carrying the principal's
//! id and username, valid for one hour. The signing secret is
//! operator-supplied configuration, injected once at startup and held
//! inside the [`JwtManager`]; nothing reaches for it globally.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use ethcache_core::store::Store;
use ethcache_core::CoreError;

/// Header carrying the session token, kept as the original API named it.
pub const AUTH_HEADER: &str = "auth_token";

const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username and wrong password are deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("auth failure: {0}")]
    Internal(String),
}

// ==============================================================================
// Claims
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    /// Issued at (seconds since UNIX epoch).
    pub iat: u64,
    /// Expiration time (seconds since UNIX epoch).
    pub exp: u64,
}

/// The authenticated principal decoded from a token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

// ==============================================================================
// JWT Manager
// ==============================================================================

pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a one-hour access token for the given principal.
    pub fn sign(&self, id: i64, username: &str) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Internal(format!("get current time: {e}")))?
            .as_secs();
        let claims = Claims {
            id,
            username: username.to_string(),
            iat: now,
            exp: now + TOKEN_LIFETIME.as_secs(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("encode JWT: {e}")))
    }

    /// Validate a token and return the principal it names.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AuthError::Unauthorized("invalid or expired token".to_string()))?;
        Ok(AuthUser {
            id: data.claims.id,
            username: data.claims.username,
        })
    }

    /// Decode the optional `auth_token` header. A missing header is an
    /// anonymous request; a header that is present but invalid is an error,
    /// never a silent downgrade to anonymous.
    pub fn optional_user(&self, headers: &HeaderMap) -> Result<Option<AuthUser>, AuthError> {
        let Some(token) = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) else {
            return Ok(None);
        };
        self.verify(token).map(Some)
    }

    pub fn require_user(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        self.optional_user(headers)?
            .ok_or_else(|| AuthError::Unauthorized("missing auth_token header".to_string()))
    }
}

// ==============================================================================
// Credential Flow
// ==============================================================================

/// Verify a username/password pair against the store and mint a token.
pub async fn authenticate(
    store: &Store,
    jwt: &JwtManager,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let user = store
        .find_user_by_username(username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    verify_password(password, &user.password_hash)?;
    jwt.sign(user.id, &user.username)
}

/// Hash a password into an Argon2id PHC string (seed path).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("hash password: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::Internal(format!("stored credential hash is malformed: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}
