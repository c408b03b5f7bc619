//! The prompt request pipeline: admit, classify, assemble, complete,
//! normalize, then account for the call.

use crate::AppState;
use crate::auth::Identity;
use crate::error::AppError;
use crate::prompt::assemble::{self, ContextFlags};
use crate::prompt::{FALLBACK_RESPONSE, Intent, PromptRequest, PromptResponse, classify, normalize};
use crate::quota::QueryLogEntry;

/// Run one prompt request end to end for an authenticated caller.
///
/// Usage is recorded only after a successful completion; a recording failure
/// is logged but never turns a produced answer into an error. The audit log
/// write is fire-and-forget.
pub async fn run(
    state: &AppState,
    identity: &Identity,
    req: &PromptRequest,
) -> Result<PromptResponse, AppError> {
    if req.is_empty() {
        return Err(AppError::InvalidInput("Prompt can not be empty".to_string()));
    }

    state.quota.admit(&identity.email)?;

    let classification =
        classify::classify(req, &state.gemini, state.config.classifier.cd_heuristic).await?;

    let response = match classification.intent {
        Intent::None => FALLBACK_RESPONSE.to_string(),
        intent => {
            let ctx = ContextFlags {
                // Navigation always gets location context; the heuristic
                // path never consulted the model about it.
                include_pwd: classification.needs_pwd || intent == Intent::ChangeDirectory,
                include_file_structure: classification.needs_file_structure
                    || intent == Intent::ChangeDirectory,
            };
            let prompt = assemble::build(intent, req, ctx).ok_or_else(|| {
                AppError::Internal(format!("no template for intent {intent}"))
            })?;

            let raw = state.gemini.complete(&prompt).await?;
            match intent {
                Intent::Script => normalize::clean_script(&raw),
                _ => raw,
            }
        }
    };

    finish(state, identity, req, &response, classification.intent);

    Ok(PromptResponse {
        response,
        action_type: classification.intent,
    })
}

/// Post-response accounting shared by the pipeline.
fn finish(state: &AppState, identity: &Identity, req: &PromptRequest, response: &str, intent: Intent) {
    if let Err(e) = state.quota.record_usage(&identity.email) {
        tracing::warn!(email = %identity.email, error = %e, "Failed to record usage");
    }

    let _ = state.audit_tx.send(QueryLogEntry {
        email: identity.email.clone(),
        prompt: req.prompt.clone(),
        os: req.os.clone(),
        existing_script: req.existing_script.clone(),
        response: response.to_string(),
        action_type: intent.as_str().to_string(),
    });
}
