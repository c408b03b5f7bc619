use axum::{Extension, Json};
use axum::extract::State;

use crate::AppState;
use crate::auth::Identity;
use crate::error::AppError;
use crate::prompt::{PromptRequest, PromptResponse, pipeline};

/// POST /prompt: the main entry point of the service.
pub async fn handle_prompt(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, AppError> {
    tracing::info!(
        email = %identity.email,
        has_script = !req.existing_script.is_empty(),
        has_readme = !req.readme_data.is_empty(),
        "Prompt request"
    );

    let response = pipeline::run(&state, &identity, &req).await?;

    tracing::info!(
        email = %identity.email,
        action_type = %response.action_type,
        "Prompt answered"
    );

    Ok(Json(response))
}
