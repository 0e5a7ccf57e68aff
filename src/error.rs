use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Fixed advisory shown when the upstream service flags the credential as
/// leaked or otherwise refuses it.
pub const CREDENTIAL_REVOKED_ADVISORY: &str = "Your API key has been flagged as leaked and \
    blocked for security. Generate a new API key and update the server environment.";

/// Fixed advisory shown when the upstream service reports a quota or rate
/// limit condition.
pub const QUOTA_EXCEEDED_ADVISORY: &str = "API quota exceeded. You have reached the usage \
    limits for the Gemini API. Wait about 60 seconds before trying again, or upgrade your plan.";

/// Fixed advisory for every other upstream failure.
pub const GENERIC_FAILURE_ADVISORY: &str =
    "Analysis failed. Please check your network connection and API key.";

/// Fixed advisory when no credential could be resolved at startup.
pub const NOT_CONFIGURED_ADVISORY: &str = "The research service has no API credential \
    configured. Set GEMINI_API_KEY and restart.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No research API credential is configured")]
    MissingCredential,

    #[error("API credential rejected: {0}")]
    CredentialRevoked(String),

    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Research request failed: {0}")]
    Unclassified(String),
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingCredential => {
                tracing::error!("Research request rejected, no API credential configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    NOT_CONFIGURED_ADVISORY.to_string(),
                )
            }
            AppError::CredentialRevoked(detail) => {
                tracing::error!(detail = %detail, "Upstream rejected the API credential");
                (
                    StatusCode::BAD_GATEWAY,
                    CREDENTIAL_REVOKED_ADVISORY.to_string(),
                )
            }
            AppError::QuotaExceeded(detail) => {
                tracing::warn!(detail = %detail, "Upstream quota exhausted");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    QUOTA_EXCEEDED_ADVISORY.to_string(),
                )
            }
            AppError::Unclassified(detail) => {
                tracing::error!(detail = %detail, "Research request failed");
                (StatusCode::BAD_GATEWAY, GENERIC_FAILURE_ADVISORY.to_string())
            }
        };

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let error = AppError::Validation("regions must not be empty".to_string());
        assert_eq!(
            error.to_string(),
            "Validation error: regions must not be empty"
        );
    }

    #[test]
    fn test_missing_credential_error() {
        let error = AppError::MissingCredential;
        assert_eq!(
            error.to_string(),
            "No research API credential is configured"
        );
    }

    #[test]
    fn test_credential_revoked_error() {
        let error = AppError::CredentialRevoked("403: key reported as leaked".to_string());
        assert_eq!(
            error.to_string(),
            "API credential rejected: 403: key reported as leaked"
        );
    }

    #[test]
    fn test_quota_exceeded_error() {
        let error = AppError::QuotaExceeded("429: quota".to_string());
        assert_eq!(error.to_string(), "API quota exceeded: 429: quota");
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (
                AppError::Validation("test".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::MissingCredential, StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::CredentialRevoked("test".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::QuotaExceeded("test".to_string()),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::Unclassified("test".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected_status) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected_status);
        }
    }

    #[test]
    fn test_app_result_ok() {
        fn returns_ok() -> AppResult<i32> {
            Ok(42)
        }
        let result = returns_ok();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }
}
