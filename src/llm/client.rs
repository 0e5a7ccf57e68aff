use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::gemini::GeminiApiError;
use super::{GenerateRequest, GenerateResponse, Provider};
use crate::error::AppError;
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

pub struct LlmClient {
    pub provider: Arc<dyn Provider>,
}

impl LlmClient {
    /// Issue a single generation call. One attempt only: quota and
    /// credential failures are terminal for the request, so there is no
    /// retry loop and no fallback provider.
    pub async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            gen_ai.request.web_search = req.web_search,
            gen_ai.request.thinking_budget = req.thinking_budget as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.response.citations = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))],
        );

        let result = self.provider.generate(req).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();

        let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
        let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name.clone());
        let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name;

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                span.record("gen_ai.response.citations", resp.citations.len());
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", failure_label(&err));

                GEN_AI_ERROR_COUNT.add(1, &[provider_kv, model_kv]);

                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    CredentialRevoked,
    QuotaExceeded,
    Unclassified,
}

/// Decide which of the three caller-visible failure kinds a raw error
/// belongs to. Authorization conditions (explicit 401/403, or error text
/// reporting a leaked/compromised key) take precedence over quota
/// conditions (429, or text mentioning quota or rate limits).
fn failure_kind(status: Option<u16>, message: &str) -> FailureKind {
    let lower = message.to_lowercase();

    if matches!(status, Some(401 | 403)) || lower.contains("leaked") || lower.contains("compromised")
    {
        FailureKind::CredentialRevoked
    } else if matches!(status, Some(429)) || lower.contains("quota") || lower.contains("rate limit")
    {
        FailureKind::QuotaExceeded
    } else {
        FailureKind::Unclassified
    }
}

fn error_status(err: &anyhow::Error) -> Option<u16> {
    err.downcast_ref::<GeminiApiError>().map(|e| e.status_code)
}

/// Map a failed generation into the typed error surfaced to the caller,
/// keeping the underlying detail for diagnostics.
pub fn classify_failure(err: anyhow::Error) -> AppError {
    let status = error_status(&err);
    let message = format!("{err:#}");

    match failure_kind(status, &message) {
        FailureKind::CredentialRevoked => AppError::CredentialRevoked(message),
        FailureKind::QuotaExceeded => AppError::QuotaExceeded(message),
        FailureKind::Unclassified => AppError::Unclassified(message),
    }
}

fn failure_label(err: &anyhow::Error) -> &'static str {
    match failure_kind(error_status(err), &err.to_string()) {
        FailureKind::CredentialRevoked => "credential_revoked",
        FailureKind::QuotaExceeded => "quota_exceeded",
        FailureKind::Unclassified => "unclassified",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_table() {
        let cases = vec![
            (Some(403), "key reported as leaked", FailureKind::CredentialRevoked),
            (Some(403), "forbidden", FailureKind::CredentialRevoked),
            (Some(401), "unauthorized", FailureKind::CredentialRevoked),
            (None, "API_KEY_LEAKED", FailureKind::CredentialRevoked),
            (None, "credential compromised", FailureKind::CredentialRevoked),
            (Some(429), "too many requests", FailureKind::QuotaExceeded),
            (None, "quota exceeded for this project", FailureKind::QuotaExceeded),
            (None, "rate limit hit", FailureKind::QuotaExceeded),
            (Some(500), "internal error", FailureKind::Unclassified),
            (None, "connection reset by peer", FailureKind::Unclassified),
        ];

        for (status, message, expected) in cases {
            assert_eq!(
                failure_kind(status, message),
                expected,
                "failure_kind({status:?}, {message:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_authorization_wins_over_quota_text() {
        // A 403 mentioning quota is still a credential problem.
        assert_eq!(
            failure_kind(Some(403), "quota check failed for key"),
            FailureKind::CredentialRevoked
        );
    }

    #[test]
    fn test_classify_leaked_key() {
        let err = anyhow::Error::new(GeminiApiError {
            status_code: 403,
            message: "PERMISSION_DENIED: API key reported as leaked".to_string(),
        });
        assert!(matches!(
            classify_failure(err),
            AppError::CredentialRevoked(_)
        ));
    }

    #[test]
    fn test_classify_quota_status() {
        let err = anyhow::Error::new(GeminiApiError {
            status_code: 429,
            message: "RESOURCE_EXHAUSTED".to_string(),
        });
        assert!(matches!(classify_failure(err), AppError::QuotaExceeded(_)));
    }

    #[test]
    fn test_classify_quota_text_without_status() {
        let err = anyhow::anyhow!("generateContent failed: quota exceeded");
        assert!(matches!(classify_failure(err), AppError::QuotaExceeded(_)));
    }

    #[test]
    fn test_classify_transport_error_unclassified() {
        let err = anyhow::anyhow!("connection refused");
        let classified = classify_failure(err);
        assert!(matches!(classified, AppError::Unclassified(_)));
        assert!(classified.to_string().contains("connection refused"));
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
    }
}
