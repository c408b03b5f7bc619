//! Intent classification: cheap local rules first, one model round trip only
//! when the request gives no other signal.

use serde::Deserialize;

use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::prompt::{Intent, PromptRequest, assemble, normalize};

/// Phrases that mark a request as directory navigation. Matched
/// case-insensitively against the prompt.
const CD_PHRASES: &[&str] = &["go to", "take me to", "navigate to", "cd to", "change directory"];

/// Outcome of classification: what to generate and which context fields the
/// generation prompt should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub needs_pwd: bool,
    pub needs_file_structure: bool,
}

impl Classification {
    fn local(intent: Intent) -> Self {
        Self {
            intent,
            needs_pwd: false,
            needs_file_structure: false,
        }
    }
}

/// Shape the model is instructed to answer with, after normalization.
/// All fields default so a partial answer still classifies.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteClassification {
    #[serde(rename = "actionType")]
    action_type: String,
    #[serde(rename = "needsPwd")]
    needs_pwd: bool,
    #[serde(rename = "needsFileStructure")]
    needs_file_structure: bool,
}

/// Classify a request, consulting the model only when local rules fail.
pub async fn classify(
    req: &PromptRequest,
    gemini: &GeminiClient,
    cd_heuristic: bool,
) -> Result<Classification, AppError> {
    if let Some(classification) = classify_local(req, cd_heuristic) {
        return Ok(classification);
    }

    let raw = gemini.complete(&assemble::classification_prompt(&req.prompt)).await?;
    parse_remote(&raw)
}

/// Local classification rules, in priority order: an attached script always
/// means SCRIPT, attached README data always means COMMANDFROMREADME, and a
/// navigation phrase means CHANGEDIRECTORY when the heuristic is enabled.
pub fn classify_local(req: &PromptRequest, cd_heuristic: bool) -> Option<Classification> {
    if !req.existing_script.is_empty() {
        return Some(Classification::local(Intent::Script));
    }
    if !req.readme_data.is_empty() {
        return Some(Classification::local(Intent::CommandFromReadme));
    }
    if cd_heuristic && contains_any_ignore_case(&req.prompt, CD_PHRASES) {
        return Some(Classification::local(Intent::ChangeDirectory));
    }
    None
}

fn parse_remote(raw: &str) -> Result<Classification, AppError> {
    let cleaned = normalize::clean_json(raw);
    let remote: RemoteClassification = serde_json::from_str(&cleaned)
        .map_err(|e| AppError::Classification(format!("unparseable classification: {e}")))?;

    let intent = match remote.action_type.to_uppercase().as_str() {
        "COMMAND" => Intent::Command,
        "SCRIPT" => Intent::Script,
        _ => Intent::None,
    };

    Ok(Classification {
        intent,
        needs_pwd: remote.needs_pwd,
        needs_file_structure: remote.needs_file_structure,
    })
}

fn contains_any_ignore_case(haystack: &str, needles: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
