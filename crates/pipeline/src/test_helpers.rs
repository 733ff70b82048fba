//! Shared mocks for pipeline tests.

use async_trait::async_trait;
use mascot_core::error::{ProviderError, StoreError};
use mascot_core::provider::{
    CompletionRequest, CompletionResponse, CompletionService, EmbeddingRequest,
    EmbeddingResponse, EmbeddingService,
};
use mascot_core::store::{StoreHit, StoreStatus, VectorQuery, VectorStore};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A completion service that replays scripted results in order.
///
/// Panics if called more times than results were provided, unless built
/// with [`ScriptedCompletion::hanging`].
pub struct ScriptedCompletion {
    results: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    hang: bool,
}

impl ScriptedCompletion {
    pub fn new(results: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
            hang: false,
        }
    }

    /// Always answers with `text`.
    pub fn answering(text: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(text_response(text))).collect())
    }

    /// Never completes.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted_completion"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedCompletion: no more results")
    }
}

pub fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        text: text.into(),
        usage: None,
        model: "mock-model".into(),
        finish_reason: Some("stop".into()),
    }
}

/// An embedder returning a fixed vector, optionally failing every call.
pub struct StaticEmbedder {
    fail_with: Option<ProviderError>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    pub fn ok() -> Self {
        Self {
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            fail_with: Some(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for StaticEmbedder {
    fn name(&self) -> &str {
        "static_embedder"
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| vec![1.0, 0.0, 0.0]).collect(),
            model: request.model,
        })
    }
}

/// A store with fixed hits, permanently unavailable, or never answering.
pub struct FixedStore {
    hits: Vec<StoreHit>,
    unavailable: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl FixedStore {
    pub fn with_hits(hits: &[(&str, &str, f32)]) -> Self {
        Self {
            hits: hits
                .iter()
                .map(|(id, text, score)| StoreHit {
                    id: id.to_string(),
                    text: text.to_string(),
                    metadata: BTreeMap::from([("filename".to_string(), format!("{id}.md"))]),
                    raw_score: *score,
                })
                .collect(),
            unavailable: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::with_hits(&[])
        }
    }

    /// Queries never complete.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::with_hits(&[])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<StoreHit>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.unavailable {
            return Err(StoreError::Unavailable("store not initialized".into()));
        }
        Ok(self.hits.iter().take(query.top_k).cloned().collect())
    }

    async fn status(&self) -> StoreStatus {
        StoreStatus {
            backend: "fixed".into(),
            collection: "test".into(),
            reachable: !self.unavailable,
            chunk_count: Some(self.hits.len() as u64),
            error: self.unavailable.then(|| "store not initialized".to_string()),
        }
    }
}
