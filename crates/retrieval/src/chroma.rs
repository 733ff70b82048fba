//! Remote local-shape store: a Chroma server reached over its v1 REST API.
//!
//! Holds the same chunks the SQLite file would, served by a shared Chroma
//! process instead of an in-process file. Chunks are scoped to a project by
//! a `project` metadata key and ranked by the server. The collection id is
//! resolved lazily by name; a failed lookup is retried on the next query.

use crate::vertex::{PROJECT_RESTRICT, normalize_distance};
use async_trait::async_trait;
use mascot_config::{DistanceMeasure, VectorConfig};
use mascot_core::error::StoreError;
use mascot_core::store::{StoreHit, StoreStatus, VectorQuery, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A collection on a Chroma server.
pub struct ChromaVectorStore {
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
    client: reqwest::Client,
}

impl ChromaVectorStore {
    pub fn from_config(config: &VectorConfig) -> Result<Self, StoreError> {
        let base_url = config
            .chroma_base_url()
            .ok_or_else(|| StoreError::Unavailable("CHROMA_HOST is not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            collection: config.collection.clone(),
            collection_id: OnceCell::new(),
            client,
        })
    }

    async fn collection_id(&self) -> Result<&str, StoreError> {
        self.collection_id
            .get_or_try_init(|| self.resolve_collection())
            .await
            .map(String::as_str)
    }

    async fn resolve_collection(&self) -> Result<String, StoreError> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, self.collection);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Chroma at {}: {e}", self.base_url)))?;
        if !response.status().is_success() {
            return Err(StoreError::Unavailable(format!(
                "Chroma collection '{}' not found (status {})",
                self.collection,
                response.status().as_u16()
            )));
        }
        let info: CollectionInfo = response
            .json()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("collection lookup: {e}")))?;
        info!(collection = %self.collection, id = %info.id, "Chroma collection resolved");
        Ok(info.id)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{id}/count", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("count: {e}")))?;
        if !response.status().is_success() {
            return Err(StoreError::QueryFailed(format!(
                "count status {}",
                response.status().as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("count response: {e}")))
    }
}

fn results_to_hits(results: QueryResults) -> Vec<StoreHit> {
    let ids = results.ids.into_iter().next().unwrap_or_default();
    let mut documents = results.documents.into_iter().next().unwrap_or_default().into_iter();
    let mut metadatas = results.metadatas.into_iter().next().unwrap_or_default().into_iter();
    let mut distances = results.distances.into_iter().next().unwrap_or_default().into_iter();

    let mut hits = Vec::with_capacity(ids.len());
    let mut missing_text = 0usize;
    for id in ids {
        let text = documents.next().flatten();
        let metadata = metadatas.next().flatten();
        let distance = distances.next().flatten().unwrap_or(0.0);

        let Some(text) = text else {
            missing_text += 1;
            continue;
        };
        let metadata: BTreeMap<String, String> = metadata
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();

        hits.push(StoreHit {
            id,
            text,
            metadata,
            raw_score: distance,
        });
    }

    if missing_text > 0 {
        warn!(missing_text, "Dropped Chroma results without a document");
    }
    hits
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<StoreHit>, StoreError> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{id}/query", self.base_url);
        let body = QueryRequest {
            query_embeddings: [query.embedding],
            n_results: query.top_k,
            r#where: BTreeMap::from([(PROJECT_RESTRICT, query.namespace)]),
            include: ["documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Chroma query: {e}")))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chroma query returned error");
            return Err(StoreError::QueryFailed(format!(
                "Chroma query status {status}: {error_body}"
            )));
        }

        let results: QueryResults = response
            .json()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Chroma query response: {e}")))?;

        let mut hits = results_to_hits(results);
        hits.truncate(query.top_k);
        debug!(namespace = query.namespace, hits = hits.len(), "Chroma query complete");
        Ok(hits)
    }

    /// Chroma reports cosine distance; lower is closer.
    fn normalize(&self, raw_score: f32) -> f32 {
        normalize_distance(DistanceMeasure::Cosine, raw_score)
    }

    async fn status(&self) -> StoreStatus {
        let (reachable, chunk_count, error) = match self.count().await {
            Ok(n) => (true, Some(n), None),
            Err(e) => (false, None, Some(e.to_string())),
        };
        StoreStatus {
            backend: self.name().into(),
            collection: self.collection.clone(),
            reachable,
            chunk_count,
            error,
        }
    }
}

// --- Chroma REST types (private) ---

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    r#where: BTreeMap<&'a str, &'a str>,
    include: [&'static str; 3],
}

#[derive(Deserialize, Default)]
struct QueryResults {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<serde_json::Map<String, Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<Option<f32>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::{
        Json, Router,
        routing::{get, post},
    };

    fn config(host: &str) -> VectorConfig {
        VectorConfig {
            chroma_host: Some(host.into()),
            ..VectorConfig::default()
        }
    }

    async fn serve(app: Router) -> (String, u16) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        ("127.0.0.1".to_string(), addr.port())
    }

    fn mock_chroma() -> Router {
        Router::new()
            .route(
                "/api/v1/collections/{name}",
                get(|Path(name): Path<String>| async move {
                    if name == "uplifted_mascot" {
                        Ok(Json(serde_json::json!({"id": "col-1", "name": name})))
                    } else {
                        Err(StatusCode::NOT_FOUND)
                    }
                }),
            )
            .route("/api/v1/collections/col-1/count", get(|| async { Json(3) }))
            .route(
                "/api/v1/collections/col-1/query",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["where"]["project"], "bifrost");
                    assert_eq!(body["n_results"], 2);
                    Json(serde_json::json!({
                        "ids": [["a", "b"]],
                        "documents": [["Bifrost is a bridge.", null]],
                        "metadatas": [[{"filename": "intro.md", "chunk_index": 0}, null]],
                        "distances": [[0.2, 0.4]]
                    }))
                }),
            )
    }

    fn store_at(host: &str, port: u16) -> ChromaVectorStore {
        let mut cfg = config(host);
        cfg.chroma_port = port;
        ChromaVectorStore::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn query_scopes_to_project_and_parses_hits() {
        let (host, port) = serve(mock_chroma()).await;
        let store = store_at(&host, port);

        let hits = store
            .query(VectorQuery {
                embedding: &[1.0, 0.0],
                top_k: 2,
                namespace: "bifrost",
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].metadata["filename"], "intro.md");
        assert_eq!(hits[0].metadata["chunk_index"], "0");
        assert!((store.normalize(hits[0].raw_score) - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn status_reports_count() {
        let (host, port) = serve(mock_chroma()).await;
        let status = store_at(&host, port).status().await;
        assert!(status.reachable);
        assert_eq!(status.backend, "chroma");
        assert_eq!(status.chunk_count, Some(3));
    }

    #[tokio::test]
    async fn missing_collection_is_unavailable() {
        let (host, port) = serve(mock_chroma()).await;
        let mut cfg = config(&host);
        cfg.chroma_port = port;
        cfg.collection = "other".into();
        let store = ChromaVectorStore::from_config(&cfg).unwrap();

        let err = store
            .query(VectorQuery {
                embedding: &[1.0],
                top_k: 1,
                namespace: "p",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!store.status().await.reachable);
    }

    #[test]
    fn requires_host() {
        assert!(ChromaVectorStore::from_config(&VectorConfig::default()).is_err());
    }
}
