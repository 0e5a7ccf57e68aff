use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{GenerateRequest, GenerateResponse, Provider, WebCitation};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Service-level failure carrying the HTTP status so callers can classify
/// it without re-parsing the message.
#[derive(Debug, Error)]
#[error("Gemini API error ({status_code}): {message}")]
pub struct GeminiApiError {
    pub status_code: u16,
    pub message: String,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    model_version: Option<String>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| anyhow::anyhow!("invalid API key header: {e}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: req.prompt.clone(),
                }],
            }],
            tools: if req.web_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                vec![]
            },
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: req.thinking_budget,
                },
            },
        };

        let url = format!("{API_BASE}/{}:generateContent", req.model);
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<GeminiErrorEnvelope>(&error_body) {
                Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
                Ok(envelope) => {
                    format!("{}: {}", envelope.error.status, envelope.error.message)
                }
                Err(_) => error_body,
            };
            return Err(GeminiApiError {
                status_code: status.as_u16(),
                message,
            }
            .into());
        }

        let resp: GeminiResponse = response.json().await?;
        Ok(into_generate_response(resp, &req.model))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn into_generate_response(resp: GeminiResponse, requested_model: &str) -> GenerateResponse {
    let candidate = resp.candidates.into_iter().next();

    let (content, finish_reason, citations) = match candidate {
        Some(candidate) => {
            let content = candidate
                .content
                .map(|c| {
                    c.parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            // Only chunks exposing both a URI and a title are usable as
            // citations.
            let citations = candidate
                .grounding_metadata
                .map(|g| g.grounding_chunks)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| match (web.uri, web.title) {
                    (Some(uri), Some(title)) => Some(WebCitation { title, uri }),
                    _ => None,
                })
                .collect();

            (content, candidate.finish_reason.unwrap_or_default(), citations)
        }
        None => (String::new(), String::new(), Vec::new()),
    };

    let (input_tokens, output_tokens) = match resp.usage_metadata {
        Some(usage) => (usage.prompt_token_count, usage.candidates_token_count),
        None => (0, 0),
    };

    GenerateResponse {
        content,
        citations,
        model: resp
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        input_tokens,
        output_tokens,
        finish_reason,
        provider: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_with_search_tool() {
        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "analyze".to_string(),
                }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: 2048,
                },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "analyze");
        assert!(json["tools"][0]["google_search"].is_object());
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            2048
        );
    }

    #[test]
    fn test_request_body_omits_tools_when_search_disabled() {
        let body = GeminiRequest {
            contents: vec![],
            tools: vec![],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_response_text_and_citations() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "{\"executiveSummary\""}, {"text": ": \"ok\"}"}]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://a.example", "title": "A"}},
                        {"web": {"uri": "https://b.example"}},
                        {"web": {"title": "no uri"}},
                        {}
                    ]
                }
            }],
            "modelVersion": "gemini-3-pro-preview",
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 48}
        }"#;

        let resp: GeminiResponse = serde_json::from_str(raw).unwrap();
        let out = into_generate_response(resp, "gemini-3-pro-preview");

        assert_eq!(out.content, "{\"executiveSummary\": \"ok\"}");
        assert_eq!(out.finish_reason, "STOP");
        assert_eq!(out.citations.len(), 1);
        assert_eq!(out.citations[0].uri, "https://a.example");
        assert_eq!(out.input_tokens, 120);
        assert_eq!(out.output_tokens, 48);
    }

    #[test]
    fn test_response_without_candidates() {
        let resp: GeminiResponse = serde_json::from_str("{}").unwrap();
        let out = into_generate_response(resp, "gemini-3-pro-preview");
        assert!(out.content.is_empty());
        assert!(out.citations.is_empty());
        assert_eq!(out.model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_error_envelope_parses() {
        let raw = r#"{"error": {"code": 429, "message": "Quota exceeded for metric", "status": "RESOURCE_EXHAUSTED"}}"#;
        let envelope: GeminiErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.error.message, "Quota exceeded for metric");
        assert_eq!(envelope.error.status, "RESOURCE_EXHAUSTED");
    }

    #[test]
    fn test_api_error_display() {
        let err = GeminiApiError {
            status_code: 403,
            message: "PERMISSION_DENIED: key reported as leaked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Gemini API error (403): PERMISSION_DENIED: key reported as leaked"
        );
    }
}
