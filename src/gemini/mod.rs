pub mod client;

pub use self::client::{GeminiClient, GeminiError};

/// Default generateContent endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
