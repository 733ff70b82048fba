//! The retrieval stage: embed the question, query the active store,
//! normalize, rank, truncate.

use crate::vector;
use mascot_core::error::{ProviderError, RetrievalError};
use mascot_core::provider::{EmbeddingRequest, EmbeddingService};
use mascot_core::query::Question;
use mascot_core::store::{ContextChunk, VectorQuery, VectorStore};
use mascot_providers::{RetryPolicy, retry_transient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Retrieves ranked context chunks for a question.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    embedding_model: String,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            embedding_model: embedding_model.into(),
            retry: RetryPolicy::default(),
            store_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// The active vector store, for health reporting.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Return at most `question.top_k` chunks, best first.
    ///
    /// Zero chunks is a valid result. Embedding is retried on transient
    /// failures; the store query is not.
    pub async fn retrieve(&self, question: &Question) -> Result<Vec<ContextChunk>, RetrievalError> {
        let started = Instant::now();
        let embedding = self.embed(&question.text).await?;

        let hits = match tokio::time::timeout(
            self.store_timeout,
            self.store.query(VectorQuery {
                embedding: &embedding,
                top_k: question.top_k,
                namespace: &question.project,
            }),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(RetrievalError::Timeout(self.store_timeout.as_millis() as u64)),
        };

        let chunks: Vec<ContextChunk> = hits
            .into_iter()
            .map(|hit| ContextChunk {
                relevance_score: self.store.normalize(hit.raw_score),
                id: hit.id,
                text: hit.text,
                source_metadata: hit.metadata,
            })
            .collect();

        let ranked = vector::rank_chunks(chunks, question.top_k);
        debug!(
            store = self.store.name(),
            project = %question.project,
            chunks = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieval complete"
        );
        Ok(ranked)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let result = retry_transient(&self.retry, "embedding", || {
            self.embedder.embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![text.to_string()],
            })
        })
        .await;

        let response = result.map_err(|failure| {
            warn!(
                service = self.embedder.name(),
                attempts = failure.attempts,
                error = %failure.error,
                "Embedding failed"
            );
            RetrievalError::EmbeddingFailed {
                attempts: failure.attempts,
                source: failure.error,
            }
        })?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|e| !e.is_empty())
            .ok_or(RetrievalError::EmbeddingFailed {
                attempts: 1,
                source: ProviderError::InvalidResponse("no embedding returned".into()),
            })
    }
}
