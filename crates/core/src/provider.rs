//! Model-service traits: the abstraction over external embedding and
//! completion backends.
//!
//! Implementations: any OpenAI-compatible endpoint (OpenAI, Ollama, vLLM,
//! Vertex AI's OpenAI-compatible surface), plus mocks in tests.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
    pub model: String,

    /// System instructions (the persona)
    pub system: String,

    /// The user turn (context block + question)
    pub user: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete response from a completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Why generation stopped ("stop", "length", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,
}

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// A human-readable name for this service (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Generate embeddings for the given texts.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError>;
}

/// Generates text from an assembled prompt.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// A human-readable name for this service.
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, ProviderError>;

    /// Whether the endpoint and credentials are usable.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_default_temperature() {
        let req: CompletionRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini",
            "system": "You are Gooey",
            "user": "What is Bifrost?",
            "max_tokens": 1024
        }))
        .unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 1024);
    }

    #[test]
    fn completion_response_omits_missing_finish_reason() {
        let resp = CompletionResponse {
            text: "Hello".into(),
            usage: None,
            model: "m".into(),
            finish_reason: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("finish_reason"));
    }
}
