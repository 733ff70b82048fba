//! OpenAI-compatible model service.
//!
//! Works with: OpenAI, Ollama, vLLM, Together AI, Vertex AI's
//! OpenAI-compatible surface, and any endpoint exposing
//! `/chat/completions` and `/embeddings`.

use async_trait::async_trait;
use mascot_core::error::ProviderError;
use mascot_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry-After fallback when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// A single OpenAI-compatible endpoint, usable for both completion and
/// embedding.
pub struct OpenAiCompatService {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatService {
    /// Create a service for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// `timeout` bounds every HTTP exchange at the transport level; callers
    /// still wrap calls in their own stage deadlines.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Map a non-success status to a provider error, consuming the body.
    async fn status_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return ProviderError::RateLimited { retry_after_secs };
        }

        if status == 401 || status == 403 {
            return ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            );
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Model service returned error");
        ProviderError::ApiError {
            status_code: status,
            message: error_body,
        }
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let body = ApiChatRequest {
            model: &request.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: &request.system,
                },
                ApiMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        debug!(service = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let api_response: ApiChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("chat completion: {e}")))?;

        parse_chat_response(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let mut req = self.client.get(format!("{}/models", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await.map_err(transport_error)?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl EmbeddingService for OpenAiCompatService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            service = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .post("/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("embedding: {e}")))?;

        parse_embedding_response(api_resp, request.inputs.len())
    }
}

fn parse_chat_response(
    api_response: ApiChatResponse,
) -> std::result::Result<CompletionResponse, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        usage,
        model: api_response.model,
        finish_reason: choice.finish_reason,
    })
}

fn parse_embedding_response(
    mut api_resp: EmbeddingApiResponse,
    expected: usize,
) -> std::result::Result<EmbeddingResponse, ProviderError> {
    // Entries carry an index; servers are not required to keep input order.
    api_resp.data.sort_by_key(|d| d.index);

    if api_resp.data.len() != expected {
        return Err(ProviderError::InvalidResponse(format!(
            "expected {expected} embedding(s), got {}",
            api_resp.data.len()
        )));
    }

    if api_resp.data.iter().any(|d| d.embedding.is_empty()) {
        return Err(ProviderError::InvalidResponse("empty embedding vector".into()));
    }

    Ok(EmbeddingResponse {
        embeddings: api_resp.data.into_iter().map(|d| d.embedding).collect(),
        model: api_resp.model,
    })
}

// --- OpenAI API types (private) ---

#[derive(Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
