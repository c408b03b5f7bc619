//! Google OAuth code exchange for the token-issuance flow.
//!
//! One outbound call exchanges the authorization code for an access token,
//! a second fetches the account email. The provider is treated as opaque:
//! anything returning `{email, verified_email}` suffices.

use serde::Deserialize;
use url::Url;

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Client for the Google OAuth endpoints configured in [`GoogleOAuthConfig`].
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleOAuthConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Build the consent URL the client opens in a browser.
    pub fn auth_code_url(&self, state: &str) -> Result<String, AppError> {
        let mut url = Url::parse(&self.config.auth_endpoint)
            .map_err(|e| AppError::Internal(format!("invalid auth endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", EMAIL_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let params = [
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_url),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                status: 502,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized("Invalid code".to_string()));
        }

        let exchange: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamMalformed(e.to_string()))?;

        Ok(exchange.access_token)
    }

    /// Fetch the account email for an access token.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo, AppError> {
        let response = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                status: 502,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamMalformed(e.to_string()))?;

        if info.email.is_empty() {
            return Err(AppError::Unauthorized("Provider returned no email".to_string()));
        }

        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
