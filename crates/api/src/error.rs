use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Receiver-level error type for HTTP handlers.
///
/// Every admission-pipeline stage short-circuits with one of these;
/// [`IntoResponse`] produces the consistent `{"error", "code"}` JSON body
/// callers match on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing X-API-Key header")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Content-Type must be application/json")]
    InvalidContentType,

    #[error("Missing X-Hub-Signature-256 header")]
    MissingSignature,

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Request body is empty")]
    EmptyPayload,

    #[error("Request body is not valid JSON")]
    InvalidJson,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown event type: {0}")]
    InvalidEventType(String),

    #[error("Missing X-Retry-ID header")]
    MissingRetryId,

    #[error("Retry attempts exhausted for id {0}")]
    RetryExhausted(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Machine-readable error code included in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "MISSING_API_KEY",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::InvalidContentType => "INVALID_CONTENT_TYPE",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::EmptyPayload => "EMPTY_PAYLOAD",
            Self::InvalidJson => "INVALID_JSON",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::InvalidEventType(_) => "INVALID_EVENT_TYPE",
            Self::MissingRetryId => "MISSING_RETRY_ID",
            Self::RetryExhausted(_) => "RETRY_EXHAUSTED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::MissingApiKey
            | Self::InvalidApiKey
            | Self::MissingSignature
            | Self::InvalidSignature => StatusCode::UNAUTHORIZED,

            Self::InvalidContentType
            | Self::EmptyPayload
            | Self::InvalidJson
            | Self::InvalidPayload(_)
            | Self::InvalidEventType(_)
            | Self::MissingRetryId => StatusCode::BAD_REQUEST,

            Self::RetryExhausted(_) => StatusCode::GONE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        tracing::debug!(%status, code, %message, "Webhook request rejected");

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_statuses() {
        assert_eq!(ApiError::MissingApiKey.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidContentType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::EmptyPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::RetryExhausted("r".into()).status(),
            StatusCode::GONE
        );
        assert_eq!(ApiError::InvalidJson.code(), "INVALID_JSON");
    }
}
