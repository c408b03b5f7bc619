//! Gateway to the Gemini generateContent endpoint.
//!
//! One call per prompt, no retry, no backoff: a failure surfaces immediately
//! to the caller as a single attempt. The nested response envelope is decoded
//! into typed optionals rather than chained dynamic lookups, so a malformed
//! envelope produces a named error instead of a panic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors from the completion gateway.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned status {status}")]
    Status { status: u16, body: String },

    #[error("malformed completion envelope: missing {0}")]
    MissingField(&'static str),

    #[error("malformed completion envelope: {0}")]
    WrongShape(String),
}

// -- Request envelope -------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

// -- Response envelope ------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the external completion service: prompt in, raw text out.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Send a single completion request and return the generated text.
    pub async fn complete(&self, prompt: &str) -> Result<String, GeminiError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Completion service error");
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let envelope: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| GeminiError::WrongShape(e.to_string()))?;

        extract_text(envelope)
    }
}

/// Walk the candidate/content/parts/text nesting, failing with the name of
/// the first level that is absent or empty.
fn extract_text(envelope: GenerateResponse) -> Result<String, GeminiError> {
    let candidate = envelope
        .candidates
        .and_then(|mut c| (!c.is_empty()).then(|| c.remove(0)))
        .ok_or(GeminiError::MissingField("candidates"))?;

    let content = candidate
        .content
        .ok_or(GeminiError::MissingField("content"))?;

    let part = content
        .parts
        .and_then(|mut p| (!p.is_empty()).then(|| p.remove(0)))
        .ok_or(GeminiError::MissingField("parts"))?;

    part.text.ok_or(GeminiError::MissingField("text"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
