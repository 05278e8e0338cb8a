//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the actor id. The middleware
//! verifies the token and attaches an [`Actor`] to the request; handlers
//! read it with `Extension<Actor>`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use folio_core::Actor;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Shortest secret accepted outside development.
pub const MIN_SECRET_LEN: usize = 32;

/// Secret used in development mode when none is configured.
const DEV_SECRET: &str = "folio-development-secret-do-not-use-in-production";

/// Token errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("JWT secret must be at least {MIN_SECRET_LEN} characters")]
    WeakSecret,

    #[error("No JWT secret configured; set server.jwt_secret or run with --dev")]
    MissingSecret,

    #[error("Token subject must not be empty")]
    EmptySubject,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid token")]
    Invalid,

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Actor id.
    pub sub: String,
    /// Issued at (unix seconds).
    pub iat: u64,
    /// Expiry (unix seconds).
    pub exp: u64,
}

/// Issues and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct JwtValidator {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
        })
    }

    /// Validator with a fixed, publicly known secret.
    pub fn new_dev(ttl_secs: u64) -> Self {
        Self {
            secret: DEV_SECRET.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    /// Use the configured secret. Without one, only `dev_mode` falls back
    /// to the development secret.
    pub fn from_secret(
        secret: Option<&str>,
        ttl_secs: u64,
        dev_mode: bool,
    ) -> Result<Self, AuthError> {
        match secret {
            Some(secret) => Self::new(secret, ttl_secs),
            None if dev_mode => {
                tracing::warn!("Development mode: using the built-in JWT secret");
                Ok(Self::new_dev(ttl_secs))
            }
            None => Err(AuthError::MissingSecret),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a token for `subject`.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        if subject.trim().is_empty() {
            return Err(AuthError::EmptySubject);
        }
        let now = unix_now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AuthError::Issue(e.to_string()))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        use jsonwebtoken::errors::ErrorKind;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Invalid,
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::EmptySubject);
        }
        Ok(data.claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Token from `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware: reject unauthenticated requests, attach the [`Actor`] otherwise.
pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let result = extract_bearer(request.headers())
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.jwt.verify(token));

    match result {
        Ok(claims) => {
            request.extensions_mut().insert(Actor::new(claims.sub));
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Rejected request");
            ApiError::unauthorized(e.to_string()).into_response()
        }
    }
}
