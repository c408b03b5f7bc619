//! Session tokens: HS256 JWTs carrying the caller's email and an expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    exp: i64,
}

/// An issued session token together with its expiry (unix seconds).
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expiry: i64,
}

/// Sign a new session token for the given email.
pub fn issue(email: &str, ttl: Duration, secret: &[u8]) -> Result<IssuedToken, AppError> {
    let expiry = (Utc::now() + ttl).timestamp();
    let claims = Claims {
        email: email.to_string(),
        exp: expiry,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(IssuedToken { token, expiry })
}

/// Verify a session token and recover the caller's identity.
///
/// Fails `Unauthorized` on a malformed token, bad signature, expired token,
/// or missing email claim. No retry: the caller must re-authenticate.
pub fn verify(token: &str, secret: &[u8]) -> Result<Identity, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("token expired".to_string())
            }
            _ => AppError::Unauthorized("invalid token".to_string()),
        })?;

    if data.claims.email.is_empty() {
        return Err(AppError::Unauthorized("token missing email claim".to_string()));
    }

    Ok(Identity {
        email: data.claims.email,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
