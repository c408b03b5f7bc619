//! Prompt request handling: intent classification, prompt assembly, and
//! model output normalization.

pub mod assemble;
pub mod classify;
pub mod normalize;
pub mod pipeline;

use serde::{Deserialize, Serialize};

/// Returned verbatim when no command or script can be produced.
pub const FALLBACK_RESPONSE: &str = "I also don't know";

/// What the caller is asking for, as classified locally or by the model.
/// Serialized values match the wire `actionType` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "COMMAND")]
    Command,
    #[serde(rename = "SCRIPT")]
    Script,
    #[serde(rename = "COMMANDFROMREADME")]
    CommandFromReadme,
    #[serde(rename = "CHANGEDIRECTORY")]
    ChangeDirectory,
    #[serde(rename = "NONE")]
    None,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Command => "COMMAND",
            Intent::Script => "SCRIPT",
            Intent::CommandFromReadme => "COMMANDFROMREADME",
            Intent::ChangeDirectory => "CHANGEDIRECTORY",
            Intent::None => "NONE",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a prompt request. Every field is optional on the wire; which ones
/// are present drives classification and prompt assembly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptRequest {
    pub prompt: String,
    pub os: String,
    pub existing_script: String,
    pub readme_data: String,
    pub pwd: String,
    pub current_folder_file_structure: String,
}

impl PromptRequest {
    /// A request with no prompt, script, or README carries nothing to act on.
    pub fn is_empty(&self) -> bool {
        self.prompt.is_empty() && self.existing_script.is_empty() && self.readme_data.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptResponse {
    pub response: String,
    #[serde(rename = "actionType")]
    pub action_type: Intent,
}
