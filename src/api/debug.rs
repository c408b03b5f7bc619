//! POST /debug: explain a failed terminal command.

use axum::{Extension, Json};
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Identity;
use crate::error::AppError;
use crate::prompt::assemble;
use crate::quota::QueryLogEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DebugRequest {
    pub command: String,
    pub os: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub response: String,
}

pub async fn handle_debug(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<DebugRequest>,
) -> Result<Json<DebugResponse>, AppError> {
    if req.command.is_empty() {
        return Err(AppError::InvalidInput("Command can not be empty".to_string()));
    }

    state.quota.admit(&identity.email)?;

    let prompt = assemble::debug_prompt(&req.command, &req.os, &req.error);
    let response = state.gemini.complete(&prompt).await?;

    if let Err(e) = state.quota.record_usage(&identity.email) {
        tracing::warn!(email = %identity.email, error = %e, "Failed to record usage");
    }

    let _ = state.audit_tx.send(QueryLogEntry {
        email: identity.email.clone(),
        prompt: req.command.clone(),
        os: req.os.clone(),
        existing_script: String::new(),
        response: response.clone(),
        action_type: "COMMANDDEBUG".to_string(),
    });

    Ok(Json(DebugResponse { response }))
}
