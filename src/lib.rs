pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod quota;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::google::GoogleOAuth;
use crate::config::Config;
use crate::db::Database;
use crate::gemini::GeminiClient;
use crate::quota::{QueryLogEntry, QuotaGuard};

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub gemini: Arc<GeminiClient>,
    pub quota: Arc<QuotaGuard>,
    pub google: Arc<GoogleOAuth>,
    pub audit_tx: tokio::sync::mpsc::UnboundedSender<QueryLogEntry>,
}

/// Build the application router with the global middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();
    let trace = TraceLayer::new_for_http();

    api::build_api_router(state.clone())
        .layer(propagate_id)
        .layer(request_id)
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from config.
fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        // Default: allow all origins for development convenience
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
