//! Vector store backends and the retrieval stage for the mascot service.

pub mod chroma;
pub mod retriever;
pub mod sqlite;
pub mod vector;
pub mod vertex;

pub use chroma::ChromaVectorStore;
pub use retriever::Retriever;
pub use sqlite::{IndexedChunk, SqliteVectorStore};
pub use vector::cosine_similarity;
pub use vertex::VertexVectorStore;

use mascot_config::{VectorBackend, VectorConfig};
use mascot_core::error::StoreError;
use mascot_core::store::VectorStore;
use std::sync::Arc;
use tracing::info;

/// Build the single vector store selected by configuration.
///
/// The local store is not opened here; a missing database only shows up on
/// the first query or health probe.
pub fn build_store(config: &VectorConfig) -> Result<Arc<dyn VectorStore>, StoreError> {
    match config.backend() {
        VectorBackend::Local => {
            let path = config.local_db_path();
            info!(backend = "sqlite", path = %path.display(), "Vector store selected");
            Ok(Arc::new(SqliteVectorStore::new(path, &config.collection)))
        }
        VectorBackend::Remote => {
            let store = ChromaVectorStore::from_config(config)?;
            let url = config.chroma_base_url().unwrap_or_default();
            info!(backend = "chroma", url = %url, "Vector store selected");
            Ok(Arc::new(store))
        }
        VectorBackend::Managed => {
            let store = VertexVectorStore::from_config(config)?;
            info!(
                backend = "vertex",
                measure = ?config.distance_measure,
                "Vector store selected"
            );
            Ok(Arc::new(store))
        }
    }
}
