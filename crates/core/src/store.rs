//! Vector store trait: nearest-neighbour lookup over indexed knowledge.
//!
//! The store is populated offline by the ingestion pipeline; this side only
//! reads. Two implementations live in `mascot-retrieval`:
//! - a local SQLite-file store
//! - a managed approximate-nearest-neighbour endpoint

use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A retrieved knowledge fragment, ready for prompt assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    /// Stable chunk id assigned at ingestion time
    pub id: String,

    /// The chunk text
    pub text: String,

    /// Free-form source metadata (file_path, filename, chunk_index, ...)
    #[serde(default)]
    pub source_metadata: BTreeMap<String, String>,

    /// Normalized relevance, higher is more relevant
    pub relevance_score: f32,
}

impl ContextChunk {
    /// Human-readable source label used in the prompt.
    ///
    /// Prefers `filename`, then the last segment of `file_path`, then the id.
    pub fn source_label(&self) -> &str {
        if let Some(name) = self.source_metadata.get("filename").filter(|s| !s.is_empty()) {
            return name;
        }
        if let Some(path) = self.source_metadata.get("file_path").filter(|s| !s.is_empty()) {
            return path.rsplit(['/', '\\']).next().unwrap_or(path);
        }
        &self.id
    }
}

/// A raw hit as returned by a backend, before score normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    /// Backend-native score or distance; see [`VectorStore::normalize`].
    pub raw_score: f32,
}

/// A nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
    pub embedding: &'a [f32],
    pub top_k: usize,
    /// Project namespace inside the configured collection.
    pub namespace: &'a str,
}

/// Reachability report for `/health` and `mascot doctor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub backend: String,
    pub collection: String,
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The core VectorStore trait.
///
/// Implementations must return at most `top_k` hits ordered best-first and
/// must report an uninitialized or unreachable store as
/// [`StoreError::Unavailable`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "vertex").
    fn name(&self) -> &str;

    /// Find the nearest neighbours of an embedding within a namespace.
    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<StoreHit>, StoreError>;

    /// Map a backend-native score to a higher-is-better relevance.
    fn normalize(&self, raw_score: f32) -> f32 {
        raw_score
    }

    /// Probe the backend without running a query.
    async fn status(&self) -> StoreStatus;
}
