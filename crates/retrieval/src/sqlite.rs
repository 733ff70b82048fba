//! SQLite vector store.
//!
//! One database file per collection, `<persist_dir>/<collection>.sqlite3`,
//! with a single table:
//! - `chunks`: id, project namespace, text, JSON metadata, f32-LE embedding blob
//!
//! The service only reads; the ingestion pipeline writes. The file is opened
//! lazily on first use so the server can start before ingestion has run.
//! A failed open is not cached and is retried on the next query.

use crate::vector;
use async_trait::async_trait;
use mascot_core::error::StoreError;
use mascot_core::store::{StoreHit, StoreStatus, VectorQuery, VectorStore};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// A chunk as written by ingestion.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: String,
    pub namespace: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

/// Read-mostly SQLite vector store, ranked by cosine similarity in process.
pub struct SqliteVectorStore {
    path: PathBuf,
    collection: String,
    pool: OnceCell<SqlitePool>,
}

impl SqliteVectorStore {
    /// Point at a database file without opening it.
    pub fn new(path: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
            pool: OnceCell::new(),
        }
    }

    /// Create (or open) a writable database with the `chunks` schema.
    ///
    /// Used by ingestion tooling and tests; the service itself never writes.
    pub async fn create(
        path: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id         TEXT PRIMARY KEY NOT NULL,
                namespace  TEXT NOT NULL,
                text       TEXT NOT NULL,
                metadata   TEXT NOT NULL DEFAULT '{}',
                embedding  BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("chunks table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_namespace ON chunks(namespace)")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("namespace index: {e}")))?;

        info!(path = %path.display(), "SQLite vector store initialized");

        Ok(Self {
            path,
            collection: collection.into(),
            pool: OnceCell::from(pool),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a chunk.
    pub async fn upsert(&self, chunk: &IndexedChunk) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let metadata = serde_json::to_string(&chunk.metadata)
            .map_err(|e| StoreError::QueryFailed(format!("metadata encode: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO chunks (id, namespace, text, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                namespace = excluded.namespace,
                text = excluded.text,
                metadata = excluded.metadata,
                embedding = excluded.embedding
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.namespace)
        .bind(&chunk.text)
        .bind(metadata)
        .bind(vector::embedding_to_blob(&chunk.embedding))
        .execute(pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("upsert: {e}")))?;

        Ok(())
    }

    /// Total chunks across all namespaces.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM chunks")
            .fetch_one(pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(cnt.max(0) as u64)
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.pool.get_or_try_init(|| self.open_read_only()).await
    }

    async fn open_read_only(&self) -> Result<SqlitePool, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Unavailable(format!(
                "vector database not found at {}; run ingestion first",
                self.path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(false)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = 'chunks'",
        )
        .fetch_one(&pool)
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let tables: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if tables == 0 {
            pool.close().await;
            return Err(StoreError::Unavailable(format!(
                "collection '{}' is not initialized (no chunks table)",
                self.collection
            )));
        }

        info!(path = %self.path.display(), "Opened SQLite vector store");
        Ok(pool)
    }

    fn row_to_candidate(row: &sqlx::sqlite::SqliteRow) -> Result<(StoreHit, Vec<f32>), StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text: {e}")))?;
        let metadata_json: Option<String> = row.try_get("metadata").ok();
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| StoreError::QueryFailed(format!("embedding: {e}")))?;

        let metadata = metadata_json
            .as_deref()
            .map(parse_metadata)
            .unwrap_or_default();

        Ok((
            StoreHit {
                id,
                text,
                metadata,
                raw_score: 0.0,
            },
            vector::blob_to_embedding(&blob),
        ))
    }
}

/// Flatten a JSON object into string metadata. Non-object JSON yields nothing.
fn parse_metadata(raw: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<StoreHit>, StoreError> {
        let pool = self.pool().await?;

        let rows = sqlx::query(
            "SELECT id, text, metadata, embedding FROM chunks WHERE namespace = ?1 ORDER BY rowid",
        )
        .bind(query.namespace)
        .fetch_all(pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut skipped = 0usize;
        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let (mut hit, embedding) = Self::row_to_candidate(row)?;
            if embedding.len() != query.embedding.len() {
                skipped += 1;
                continue;
            }
            hit.raw_score = vector::cosine_similarity(query.embedding, &embedding);
            hits.push(hit);
        }

        if skipped > 0 {
            warn!(
                skipped,
                dimension = query.embedding.len(),
                "Skipped chunks with mismatched embedding dimension"
            );
        }

        debug!(
            namespace = query.namespace,
            candidates = hits.len(),
            top_k = query.top_k,
            "SQLite vector scan complete"
        );

        Ok(vector::rank_hits(hits, query.top_k))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, namespace: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.into(),
            namespace: namespace.into(),
            text: format!("{id} text"),
            metadata: BTreeMap::from([
                ("file_path".to_string(), format!("docs/{id}.md")),
                ("chunk_index".to_string(), "0".to_string()),
            ]),
            embedding,
        }
    }

    async fn seeded(dir: &tempfile::TempDir) -> SqliteVectorStore {
        let path = dir.path().join("test.sqlite3");
        let store = SqliteVectorStore::create(&path, "test").await.unwrap();
        store.upsert(&chunk("near", "bifrost", vec![1.0, 0.0])).await.unwrap();
        store.upsert(&chunk("mid", "bifrost", vec![0.7, 0.7])).await.unwrap();
        store.upsert(&chunk("far", "bifrost", vec![0.0, 1.0])).await.unwrap();
        store.upsert(&chunk("other", "demicracy", vec![1.0, 0.0])).await.unwrap();
        store
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_within_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;

        let hits = store
            .query(VectorQuery {
                embedding: &[1.0, 0.0],
                top_k: 2,
                namespace: "bifrost",
            })
            .await
            .unwrap();

        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].raw_score > hits[1].raw_score);
        assert_eq!(hits[0].metadata["file_path"], "docs/near.md");
    }

    #[tokio::test]
    async fn unknown_namespace_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;
        let hits = store
            .query(VectorQuery {
                embedding: &[1.0, 0.0],
                top_k: 5,
                namespace: "nope",
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn reopened_read_only_sees_ingested_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(&dir).await.path().to_path_buf();

        let reader = SqliteVectorStore::new(&path, "test");
        assert_eq!(reader.count().await.unwrap(), 4);
        let status = reader.status().await;
        assert!(status.reachable);
        assert_eq!(status.chunk_count, Some(4));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.sqlite3");
        let reader = SqliteVectorStore::new(&path, "late");

        let err = reader
            .query(VectorQuery {
                embedding: &[1.0],
                top_k: 1,
                namespace: "p",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!reader.status().await.reachable);

        // Ingestion runs after the server started.
        let writer = SqliteVectorStore::create(&path, "late").await.unwrap();
        writer.upsert(&chunk("c1", "p", vec![1.0])).await.unwrap();

        let hits = reader
            .query(VectorQuery {
                embedding: &[1.0],
                top_k: 1,
                namespace: "p",
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn file_without_chunks_table_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite3");
        let pool = SqlitePoolOptions::new()
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(true),
            )
            .await
            .unwrap();
        sqlx::query("CREATE TABLE unrelated (x INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let reader = SqliteVectorStore::new(&path, "empty");
        let err = reader.count().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;
        store
            .upsert(&chunk("wide", "bifrost", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let hits = store
            .query(VectorQuery {
                embedding: &[1.0, 0.0],
                top_k: 10,
                namespace: "bifrost",
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.id != "wide"));
    }

    #[test]
    fn metadata_flattens_non_string_values() {
        let meta = parse_metadata(r#"{"filename":"a.md","chunk_index":3,"skip":null}"#);
        assert_eq!(meta["filename"], "a.md");
        assert_eq!(meta["chunk_index"], "3");
        assert!(!meta.contains_key("skip"));
        assert!(parse_metadata("not json").is_empty());
    }
}
