//! The generation stage: one completion call, bounded, never retried.

use mascot_core::error::{GenerationError, ProviderError};
use mascot_core::prompt::AssembledPrompt;
use mascot_core::provider::{CompletionRequest, CompletionService};
use mascot_core::query::Answer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default generation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Calls the completion service and shapes the reply into an [`Answer`].
pub struct Generator {
    service: Arc<dyn CompletionService>,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl Generator {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            temperature: 0.7,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn service(&self) -> &Arc<dyn CompletionService> {
        &self.service
    }

    /// Generate with the configured timeout.
    pub async fn generate(
        &self,
        prompt: &AssembledPrompt,
        max_output_tokens: u32,
    ) -> Result<Answer, GenerationError> {
        self.generate_within(prompt, max_output_tokens, self.timeout)
            .await
    }

    /// Generate, giving up after the configured timeout or `remaining`,
    /// whichever is shorter.
    pub async fn generate_within(
        &self,
        prompt: &AssembledPrompt,
        max_output_tokens: u32,
        remaining: Duration,
    ) -> Result<Answer, GenerationError> {
        let timeout = self.timeout.min(remaining);
        let timeout_secs = timeout.as_secs_f64().ceil() as u64;

        let request = CompletionRequest {
            model: self.model.clone(),
            system: prompt.system_prompt.clone(),
            user: prompt.user_message(),
            temperature: self.temperature,
            max_tokens: max_output_tokens,
        };

        let started = Instant::now();
        let response = match tokio::time::timeout(timeout, self.service.complete(request)).await {
            Err(_) => {
                warn!(service = self.service.name(), timeout_secs, "Generation timed out");
                return Err(GenerationError::Timeout(timeout_secs));
            }
            Ok(Err(ProviderError::Timeout(msg))) => {
                warn!(service = self.service.name(), %msg, "Generation timed out in transport");
                return Err(GenerationError::Timeout(timeout_secs));
            }
            Ok(Err(e)) => {
                warn!(service = self.service.name(), error = %e, "Generation failed");
                return Err(GenerationError::Transport(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        let text = response.text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        debug!(
            model = %response.model,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );

        Ok(Answer {
            text: text.to_string(),
            used_chunk_ids: prompt.used_chunk_ids.clone(),
            confidence: confidence(&prompt.used_scores),
        })
    }
}

/// Mean relevance of the used chunks, clamped to [0, 1].
pub fn confidence(scores: &[f32]) -> Option<f32> {
    if scores.is_empty() {
        return None;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    Some(if mean.is_nan() { 0.0 } else { mean.clamp(0.0, 1.0) })
}
