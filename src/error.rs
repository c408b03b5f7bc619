use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::gemini::GeminiError;

/// Unified application error type.
///
/// Every failure a request can hit maps onto one of these variants, and each
/// variant maps onto exactly one HTTP status. The wire shape is always a flat
/// `{"error": message}` object; internal causes (store errors, upstream
/// bodies) are logged but replaced by a generic client message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Identity not registered: {0}")]
    NotRegistered(String),

    #[error("Daily quota limit reached")]
    QuotaExceeded,

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Completion service error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed completion response: {0}")]
    UpstreamMalformed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Flat error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::NotRegistered(_) => StatusCode::UNAUTHORIZED,
            Self::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Classification(_)
            | Self::Upstream { .. }
            | Self::UpstreamMalformed(_)
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. 4xx variants carry their bare inner
    /// text, without the variant prefix the `Display` impl adds for logs;
    /// 5xx causes are replaced by a generic message so internals never leak.
    fn client_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::Unauthorized(msg) => msg.clone(),
            Self::NotRegistered(_) => "Identity not registered".to_string(),
            Self::QuotaExceeded => self.to_string(),
            Self::Classification(_) => "Error processing prompt".to_string(),
            Self::Upstream { .. } | Self::UpstreamMalformed(_) => {
                "Something went wrong. Please try again!".to_string()
            }
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        tracing::error!(error = %err, "Database error");
        Self::Database(err.to_string())
    }
}

impl From<GeminiError> for AppError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Status { status, body } => Self::Upstream {
                status,
                message: body,
            },
            // Transport failures have no upstream status; treat as bad gateway.
            GeminiError::Transport(e) => Self::Upstream {
                status: 502,
                message: e.to_string(),
            },
            GeminiError::MissingField(field) => {
                Self::UpstreamMalformed(format!("missing {field}"))
            }
            GeminiError::WrongShape(msg) => Self::UpstreamMalformed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotRegistered("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::QuotaExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Classification("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Upstream {
                status: 503,
                message: "x".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_use_generic_messages() {
        let err = AppError::Database("secret connection string".into());
        assert!(!err.client_message().contains("secret"));

        let err = AppError::Upstream {
            status: 500,
            message: "internal upstream detail".into(),
        };
        assert!(!err.client_message().contains("upstream detail"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = AppError::QuotaExceeded;
        assert_eq!(err.client_message(), "Daily quota limit reached");

        let err = AppError::InvalidInput("prompt can not be empty".into());
        assert!(err.client_message().contains("prompt can not be empty"));
    }

    #[test]
    fn test_client_errors_carry_no_variant_prefix() {
        let err = AppError::Unauthorized("Invalid code".into());
        assert_eq!(err.client_message(), "Invalid code");

        let err = AppError::InvalidInput("Command can not be empty".into());
        assert_eq!(err.client_message(), "Command can not be empty");

        // The identity itself stays out of the wire body.
        let err = AppError::NotRegistered("ghost@example.com".into());
        assert_eq!(err.client_message(), "Identity not registered");
    }
}
