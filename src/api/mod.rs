//! HTTP surface: route table and handlers.

pub mod debug;
pub mod health;
pub mod prompt;
pub mod run;
pub mod token;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::AppState;
use crate::auth::middleware::require_auth;

/// Build the route table. Token issuance and health stay public; everything
/// that reaches the model sits behind the auth middleware.
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/googleAuthUrl", post(token::google_auth_url))
        .route("/token", post(token::issue_token));

    let protected = Router::new()
        .route("/prompt", post(prompt::handle_prompt))
        .route("/debug", post(debug::handle_debug))
        .route("/run/init", post(run::handle_project_init))
        .layer(from_fn_with_state(state, require_auth));

    public.merge(protected)
}
