//! Managed vector store: Vertex AI Vector Search over its public REST endpoint.
//!
//! Each query is a single `findNeighbors` call restricted to the project
//! namespace with a `project` token restrict. Datapoints are expected to
//! carry their chunk text and source metadata in `embeddingMetadata`.

use async_trait::async_trait;
use mascot_config::{DistanceMeasure, VectorConfig};
use mascot_core::error::StoreError;
use mascot_core::store::{StoreHit, StoreStatus, VectorQuery, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Restrict namespace used to scope neighbours to one project.
pub const PROJECT_RESTRICT: &str = "project";

/// Map a backend distance to a higher-is-better relevance.
pub fn normalize_distance(measure: DistanceMeasure, raw: f32) -> f32 {
    match measure {
        DistanceMeasure::DotProduct => raw,
        DistanceMeasure::Cosine => 1.0 - raw,
        DistanceMeasure::SquaredL2 => 1.0 / (1.0 + raw.max(0.0)),
    }
}

/// A Vertex AI Vector Search index endpoint.
pub struct VertexVectorStore {
    find_neighbors_url: String,
    endpoint_url: String,
    deployed_index_id: String,
    collection: String,
    api_token: Option<String>,
    measure: DistanceMeasure,
    client: reqwest::Client,
}

impl VertexVectorStore {
    /// Build from configuration. Fails if the managed fields are incomplete.
    pub fn from_config(config: &VectorConfig) -> Result<Self, StoreError> {
        let endpoint_url = config
            .endpoint_url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("VECTOR_ENDPOINT_URL is not set".into()))?;
        let endpoint_id = config
            .endpoint_id
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("VECTOR_ENDPOINT_ID is not set".into()))?;
        let project = config
            .gcp_project_id
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("GCP_PROJECT_ID is not set".into()))?;

        let endpoint_url = endpoint_url.trim_end_matches('/').to_string();
        let find_neighbors_url = format!(
            "{endpoint_url}/v1/projects/{project}/locations/{}/indexEndpoints/{endpoint_id}:findNeighbors",
            config.gcp_region
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            find_neighbors_url,
            endpoint_url,
            deployed_index_id: config.deployed_index_id.clone(),
            collection: config.collection.clone(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            measure: config.distance_measure,
            client,
        })
    }

    fn request_body<'a>(&'a self, query: &VectorQuery<'a>) -> FindNeighborsRequest<'a> {
        FindNeighborsRequest {
            deployed_index_id: &self.deployed_index_id,
            queries: vec![NeighborQuery {
                datapoint: QueryDatapoint {
                    datapoint_id: "query",
                    feature_vector: query.embedding,
                    restricts: vec![Restrict {
                        namespace: PROJECT_RESTRICT,
                        allow_list: vec![query.namespace],
                    }],
                },
                neighbor_count: query.top_k,
            }],
            return_full_datapoint: true,
        }
    }
}

fn neighbors_to_hits(response: FindNeighborsResponse) -> Vec<StoreHit> {
    let mut hits = Vec::new();
    let mut missing_text = 0usize;

    for neighbor in response
        .nearest_neighbors
        .into_iter()
        .flat_map(|n| n.neighbors)
    {
        let mut metadata: BTreeMap<String, String> = match neighbor.datapoint.embedding_metadata {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        let Some(text) = metadata.remove("text") else {
            missing_text += 1;
            continue;
        };

        hits.push(StoreHit {
            id: neighbor.datapoint.datapoint_id,
            text,
            metadata,
            raw_score: neighbor.distance,
        });
    }

    if missing_text > 0 {
        warn!(missing_text, "Dropped neighbours without embeddingMetadata.text");
    }
    hits
}

#[async_trait]
impl VectorStore for VertexVectorStore {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<StoreHit>, StoreError> {
        let body = self.request_body(&query);

        let mut req = self.client.post(&self.find_neighbors_url).json(&body);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("findNeighbors: {e}")))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "findNeighbors returned error");
            return Err(match status {
                401 | 403 | 404 => {
                    StoreError::Unavailable(format!("findNeighbors status {status}"))
                }
                _ => StoreError::QueryFailed(format!("findNeighbors status {status}: {error_body}")),
            });
        }

        let parsed: FindNeighborsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("findNeighbors response: {e}")))?;

        let mut hits = neighbors_to_hits(parsed);
        hits.truncate(query.top_k);
        debug!(namespace = query.namespace, hits = hits.len(), "findNeighbors complete");
        Ok(hits)
    }

    fn normalize(&self, raw_score: f32) -> f32 {
        normalize_distance(self.measure, raw_score)
    }

    /// Probes the endpoint host with the configured token. Any answer other
    /// than 401/403 counts as reachable.
    async fn status(&self) -> StoreStatus {
        let mut req = self.client.get(&self.endpoint_url);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        let (reachable, error) = match req.send().await {
            Ok(response) => match response.status().as_u16() {
                status @ (401 | 403) => {
                    (false, Some(format!("endpoint rejected credentials (status {status})")))
                }
                _ => (true, None),
            },
            Err(e) => (false, Some(e.to_string())),
        };
        StoreStatus {
            backend: self.name().into(),
            collection: self.collection.clone(),
            reachable,
            chunk_count: None,
            error,
        }
    }
}

// --- Vertex REST types (private) ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsRequest<'a> {
    deployed_index_id: &'a str,
    queries: Vec<NeighborQuery<'a>>,
    return_full_datapoint: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NeighborQuery<'a> {
    datapoint: QueryDatapoint<'a>,
    neighbor_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryDatapoint<'a> {
    datapoint_id: &'a str,
    feature_vector: &'a [f32],
    restricts: Vec<Restrict<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Restrict<'a> {
    namespace: &'a str,
    allow_list: Vec<&'a str>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsResponse {
    #[serde(default)]
    nearest_neighbors: Vec<NearestNeighbors>,
}

#[derive(Deserialize)]
struct NearestNeighbors {
    #[serde(default)]
    neighbors: Vec<Neighbor>,
}

#[derive(Deserialize)]
struct Neighbor {
    datapoint: NeighborDatapoint,
    #[serde(default)]
    distance: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NeighborDatapoint {
    datapoint_id: String,
    #[serde(default)]
    embedding_metadata: Option<Value>,
}
