use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::auth::token;
use crate::error::AppError;

/// Axum middleware that reads the session token from the Authorization
/// header, verifies it against the process-wide signing key, and injects an
/// [`Identity`](crate::auth::Identity) into request extensions.
///
/// The terminal client historically sent the bare JWT; standard clients send
/// `Bearer <jwt>`. Both are accepted.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = extract_credential(&request)?;
    let identity = token::verify(&credential, state.config.auth.jwt_secret.as_bytes())?;

    tracing::debug!(email = %identity.email, "Authenticated request");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extract the session token from the Authorization header, with or without
/// a `Bearer ` prefix.
fn extract_credential(request: &Request) -> Result<String, AppError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".to_string()))?;

    let credential = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if credential.is_empty() {
        return Err(AppError::Unauthorized("Empty credential".to_string()));
    }

    Ok(credential.to_string())
}
