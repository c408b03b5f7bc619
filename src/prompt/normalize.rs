//! Normalization of raw model output into parseable JSON or runnable script
//! text. Models wrap structured answers in markdown fences more often than
//! not; these strip the wrapping without touching the payload.

use std::sync::LazyLock;

use regex::Regex;

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Strip markdown wrapping and repair trailing commas so the text decodes as
/// JSON.
///
/// The first `json` occurrence is removed (the fence language tag), then all
/// backtick fences and all newlines, then any comma directly before a closing
/// brace or bracket. Payload strings containing the word `json` or literal
/// newlines would be mangled; the structured responses requested here never
/// contain either.
pub fn clean_json(raw: &str) -> String {
    let cleaned = raw.replacen("json", "", 1);
    let cleaned = cleaned.replace("```", "");
    let cleaned = cleaned.replace('\n', "");
    TRAILING_COMMA.replace_all(&cleaned, "$1").into_owned()
}

/// Strip `sh` markdown fences from a generated script, keeping newlines
/// intact so the script stays runnable.
pub fn clean_script(raw: &str) -> String {
    raw.replace("```sh", "").replace("```", "")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_fenced_with_trailing_commas() {
        let raw = "```json\n{\"a\": 1, \"b\": [1,2,],}\n```";
        let cleaned = clean_json(raw);
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn test_clean_json_plain_object_untouched() {
        let cleaned = clean_json(r#"{"actionType": "COMMAND"}"#);
        assert_eq!(cleaned, r#"{"actionType": "COMMAND"}"#);
    }

    #[test]
    fn test_clean_json_strips_language_tag_once() {
        // Only the first occurrence goes; the second survives as payload.
        let cleaned = clean_json(r#"json {"format": "json"}"#);
        assert_eq!(cleaned, r#" {"format": "json"}"#);
    }

    #[test]
    fn test_clean_json_removes_newlines() {
        let cleaned = clean_json("{\n  \"a\": 1\n}");
        assert_eq!(cleaned, "{  \"a\": 1}");
    }

    #[test]
    fn test_clean_json_trailing_comma_with_whitespace() {
        let cleaned = clean_json("[1, 2,   ]");
        assert_eq!(cleaned, "[1, 2]");
    }

    #[test]
    fn test_clean_json_idempotent() {
        let once = clean_json("```json\n{\"a\": 1,}\n```");
        assert_eq!(clean_json(&once), once);
    }

    #[test]
    fn test_clean_script_keeps_newlines() {
        let cleaned = clean_script("```sh\necho hi\n```");
        assert_eq!(cleaned, "\necho hi\n");
    }

    #[test]
    fn test_clean_script_unfenced_untouched() {
        let script = "#!/bin/sh\necho hi\n";
        assert_eq!(clean_script(script), script);
    }

    #[test]
    fn test_clean_script_idempotent() {
        let once = clean_script("```sh\necho hi\n```");
        assert_eq!(clean_script(&once), once);
    }
}
