//! Token issuance: Google authorization code in, session JWT out. The usage
//! record is provisioned here so the first authenticated call finds it.

use axum::Json;
use axum::extract::State;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::token;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthUrlRequest {
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(rename = "googleAuthCode")]
    pub google_auth_code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    pub expiry: i64,
}

/// Hand the client the Google consent URL to open in a browser.
pub async fn google_auth_url(
    State(state): State<AppState>,
    Json(req): Json<AuthUrlRequest>,
) -> Result<Json<AuthUrlResponse>, AppError> {
    if !state.config.google.is_configured() {
        return Err(AppError::Internal("Google OAuth is not configured".to_string()));
    }

    let url = state.google.auth_code_url(&req.state)?;
    Ok(Json(AuthUrlResponse { url }))
}

/// Exchange a Google authorization code for a session token, provisioning
/// the caller's usage record on the way.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if req.google_auth_code.is_empty() {
        return Err(AppError::InvalidInput("googleAuthCode can not be empty".to_string()));
    }

    let access_token = state.google.exchange_code(&req.google_auth_code).await?;
    let info = state.google.fetch_userinfo(&access_token).await?;

    state.quota.provision(&info.email)?;

    let ttl = Duration::days(state.config.auth.token_ttl_days);
    let issued = token::issue(&info.email, ttl, state.config.auth.jwt_secret.as_bytes())?;

    tracing::info!(email = %info.email, "Issued session token");

    Ok(Json(TokenResponse {
        jwt_token: issued.token,
        expiry: issued.expiry,
    }))
}
