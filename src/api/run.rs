//! POST /run/init: ordered setup commands for an unfamiliar project.

use axum::{Extension, Json};
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Identity;
use crate::error::AppError;
use crate::prompt::{assemble, normalize};
use crate::quota::QueryLogEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectInitRequest {
    pub files: Vec<String>,
    pub readme: String,
    pub makefile: String,
    pub os: String,
    #[serde(rename = "projectFolderName")]
    pub project_folder_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectInitResponse {
    #[serde(rename = "projectType")]
    pub project_type: String,
    #[serde(default)]
    pub commands: Vec<ProjectInitCommand>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectInitCommand {
    pub command: String,
    #[serde(default)]
    pub description: String,
}

pub async fn handle_project_init(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ProjectInitRequest>,
) -> Result<Json<ProjectInitResponse>, AppError> {
    if req.files.is_empty() {
        return Err(AppError::InvalidInput("files can not be empty".to_string()));
    }

    state.quota.admit(&identity.email)?;

    let prompt = assemble::project_init_prompt(
        &req.files,
        &req.readme,
        &req.makefile,
        &req.project_folder_name,
    );
    let raw = state.gemini.complete(&prompt).await?;

    let cleaned = normalize::clean_json(&raw);
    let response: ProjectInitResponse = serde_json::from_str(&cleaned)
        .map_err(|e| AppError::UpstreamMalformed(format!("unparseable init commands: {e}")))?;

    if let Err(e) = state.quota.record_usage(&identity.email) {
        tracing::warn!(email = %identity.email, error = %e, "Failed to record usage");
    }

    let _ = state.audit_tx.send(QueryLogEntry {
        email: identity.email.clone(),
        prompt: String::new(),
        os: req.os.clone(),
        existing_script: String::new(),
        response: response.project_type.clone(),
        action_type: "PROJECTINIT".to_string(),
    });

    Ok(Json(response))
}
