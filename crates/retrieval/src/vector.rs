//! Vector similarity and ranking utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity
//! - Stable best-first ranking of scored hits

use mascot_core::store::{ContextChunk, StoreHit};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Decode a little-endian `f32` blob. Trailing bytes are ignored.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Serialize an embedding vector to a little-endian blob.
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Sort hits best-first by raw score and keep at most `limit`.
///
/// The sort is stable: equal scores keep their input order.
pub fn rank_hits(mut hits: Vec<StoreHit>, limit: usize) -> Vec<StoreHit> {
    hits.sort_by(|a, b| finite(b.raw_score).total_cmp(&finite(a.raw_score)));
    hits.truncate(limit);
    hits
}

/// Sort chunks best-first by relevance and keep at most `limit`.
pub fn rank_chunks(mut chunks: Vec<ContextChunk>, limit: usize) -> Vec<ContextChunk> {
    chunks.sort_by(|a, b| finite(b.relevance_score).total_cmp(&finite(a.relevance_score)));
    chunks.truncate(limit);
    chunks
}

/// NaN sorts last.
fn finite(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}
