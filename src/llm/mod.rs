pub mod client;
pub mod gemini;

pub use client::LlmClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// Enable the provider's web-search grounding tool for this call.
    pub web_search: bool,
    /// Upper bound on the model's reasoning budget, in tokens.
    pub thinking_budget: u32,
}

/// A web reference attached to the response by the grounding tool,
/// independent of the generated text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebCitation {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub citations: Vec<WebCitation>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
    pub provider: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
    fn name(&self) -> &str;
}
