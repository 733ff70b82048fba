//! Request, question and answer types for a single query.

use serde::{Deserialize, Serialize};

/// Default number of context chunks to retrieve.
pub const DEFAULT_TOP_K: usize = 5;

/// The raw `POST /ask-mascot` body, exactly as decoded from the wire.
///
/// Nothing here is trusted; `mascot-pipeline`'s validator turns it into a
/// [`Question`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub project: String,
    pub mascot: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
}

/// A validated question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Selects the store namespace.
    pub project: String,
    /// Persona id, resolved later against the registry.
    pub persona: String,
    /// Trimmed question text, 1–1000 characters.
    pub text: String,
    /// Number of chunks to retrieve, 1–20.
    pub top_k: usize,
}

/// The grounded answer returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Ids of the chunks that made it into the prompt, in relevance order.
    pub used_chunk_ids: Vec<String>,
    /// Mean relevance of the used chunks, clamped to [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}
