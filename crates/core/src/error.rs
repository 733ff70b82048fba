//! Error types for the mascot query pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the orchestrator folds them
//! into [`QueryError`], the only error type the HTTP layer ever sees.

use thiserror::Error;

/// Maximum accepted question length, in characters, after trimming.
pub const MAX_QUESTION_CHARS: usize = 1000;
/// Inclusive bounds for `top_k`.
pub const MIN_TOP_K: i64 = 1;
pub const MAX_TOP_K: i64 = 20;

/// The terminal rejection reasons of a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Rate limit exceeded: {limit} per 1 minute")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    #[error("{0}")]
    BadInput(#[from] ValidationError),

    #[error("Unknown mascot: {persona}. Available: {}", .available.join(", "))]
    PersonaNotFound {
        persona: String,
        available: Vec<String>,
    },

    #[error("Retrieval backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),
}

impl QueryError {
    /// Short machine-readable label, used in logs and metrics fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::BadInput(_) => "bad_input",
            Self::PersonaNotFound { .. } => "persona_not_found",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::GenerationFailed(_) => "generation_failed",
        }
    }
}

/// Result type alias for the query pipeline.
pub type Result<T> = std::result::Result<T, QueryError>;

// --- Bounded context errors ---

/// Request validation failures. The display text is returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("question length must be between 1 and {max} characters (got {0})", max = MAX_QUESTION_CHARS)]
    QuestionLength(usize),

    #[error("top_k must be an integer between {min} and {max} (got {0})", min = MIN_TOP_K, max = MAX_TOP_K)]
    TopKOutOfRange(i64),

    #[error("mascot must not be empty")]
    EmptyPersona,

    #[error("project must not be empty")]
    EmptyProject,

    #[error("invalid request body: {0}")]
    Malformed(String),
}

/// Failures talking to an external model service (embedding or completion).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Network failures, timeouts, 429 and 5xx responses are transient;
    /// auth, configuration and decoding failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) | Self::InvalidResponse(_) => {
                false
            }
        }
    }
}

/// Failures of a vector-store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store is not initialized, not configured, or cannot be reached.
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Vector query failed: {0}")]
    QueryFailed(String),
}

/// Failures of the retrieval stage as a whole.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Embedding failed after {attempts} attempt(s): {source}")]
    EmbeddingFailed {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Retrieval timed out after {0}ms")]
    Timeout(u64),
}

/// Failures of the generation stage. Never retried.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("completion service timed out after {0}s")]
    Timeout(u64),

    #[error("completion service transport failure: {0}")]
    Transport(String),

    #[error("completion service returned an empty answer")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_displays_wire_message() {
        let err = QueryError::RateLimited {
            limit: 10,
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "Rate limit exceeded: 10 per 1 minute");
        assert_eq!(err.kind(), "rate_limited");
    }

    #[test]
    fn persona_not_found_lists_available() {
        let err = QueryError::PersonaNotFound {
            persona: "nonexistent".into(),
            available: vec!["bill".into(), "gooey".into()],
        };
        let text = err.to_string();
        assert!(text.contains("nonexistent"));
        assert!(text.contains("bill, gooey"));
    }

    #[test]
    fn validation_error_mentions_question_length() {
        let err = QueryError::from(ValidationError::QuestionLength(0));
        assert!(err.to_string().contains("question length"));
        assert_eq!(err.kind(), "bad_input");
    }

    #[test]
    fn validation_messages_name_bounds_and_value() {
        assert_eq!(
            ValidationError::QuestionLength(1001).to_string(),
            "question length must be between 1 and 1000 characters (got 1001)"
        );
        assert_eq!(
            ValidationError::TopKOutOfRange(25).to_string(),
            "top_k must be an integer between 1 and 20 (got 25)"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::Timeout("10s".into()).is_transient());
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "busy".into()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("key".into()).is_transient());
    }

    #[test]
    fn embedding_failure_keeps_source() {
        let err = RetrievalError::EmbeddingFailed {
            attempts: 3,
            source: ProviderError::Network("dns".into()),
        };
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(err.to_string().contains("dns"));
    }
}
