//! Wiring: configuration in, ready-to-serve orchestrator out.

use crate::context::PromptAssembler;
use crate::generator::Generator;
use crate::orchestrator::{Limits, QueryOrchestrator};
use crate::persona::PersonaRegistry;
use crate::rate_gate::RateGate;
use mascot_config::AppConfig;
use mascot_core::error::{ProviderError, StoreError};
use mascot_core::provider::{CompletionService, EmbeddingService};
use mascot_core::store::VectorStore;
use mascot_providers::{OpenAiCompatService, RetryPolicy};
use mascot_retrieval::Retriever;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Startup failures while building the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to build {service} client: {source}")]
    Provider {
        service: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to build vector store: {0}")]
    Store(#[from] StoreError),
}

/// Build the orchestrator with HTTP-backed services and the configured store.
pub fn from_config(config: &AppConfig) -> Result<QueryOrchestrator, BuildError> {
    let completion = OpenAiCompatService::new(
        "llm",
        config.llm.api_url.clone(),
        config.llm.api_key.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )
    .map_err(|source| BuildError::Provider {
        service: "generation",
        source,
    })?;

    let embedder = OpenAiCompatService::new(
        "embedding",
        config.embedding_api_url(),
        config.embedding_api_key().map(str::to_string),
        Duration::from_secs(config.embedding.timeout_secs),
    )
    .map_err(|source| BuildError::Provider {
        service: "embedding",
        source,
    })?;

    let store = mascot_retrieval::build_store(&config.vector)?;

    Ok(with_services(
        config,
        Arc::new(embedder),
        Arc::new(completion),
        store,
    ))
}

/// Build the orchestrator around already-constructed services.
pub fn with_services(
    config: &AppConfig,
    embedder: Arc<dyn EmbeddingService>,
    completion: Arc<dyn CompletionService>,
    store: Arc<dyn VectorStore>,
) -> QueryOrchestrator {
    let retry = RetryPolicy {
        max_retries: config.embedding.max_retries,
        base_delay: Duration::from_millis(config.embedding.backoff_base_ms),
        attempt_timeout: Duration::from_secs(config.embedding.timeout_secs),
    };
    let retriever = Retriever::new(embedder, store, config.embedding.model.clone())
        .with_retry(retry)
        .with_store_timeout(Duration::from_secs(config.vector.timeout_secs));

    let generator = Generator::new(completion, config.llm.model.clone())
        .with_temperature(config.llm.temperature)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));

    let personas = PersonaRegistry::from_config(&config.personas);
    info!(
        personas = ?personas.ids(),
        model = %config.llm.model,
        embedding_model = %config.embedding.model,
        "Pipeline ready"
    );

    QueryOrchestrator::new(
        Arc::new(RateGate::new()),
        retriever,
        personas,
        PromptAssembler::new(config.limits.max_input_tokens),
        generator,
        Limits {
            rate_limit_per_minute: config.limits.rate_limit_per_minute,
            max_output_tokens: config.limits.max_output_tokens,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        },
    )
}
