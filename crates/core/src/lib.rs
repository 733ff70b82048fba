//! # Mascot Core
//!
//! Domain types, traits, and error definitions for the mascot RAG service.
//! This crate has **no framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design
//!
//! Every external collaborator is a trait here; implementations live in
//! their own crates. This enables:
//! - Swapping the vector-store backend via configuration
//! - Testing the whole pipeline with mock services
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod persona;
pub mod prompt;
pub mod provider;
pub mod query;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{
    GenerationError, ProviderError, QueryError, Result, RetrievalError, StoreError,
    ValidationError,
};
pub use persona::Persona;
pub use prompt::AssembledPrompt;
pub use provider::{
    CompletionRequest, CompletionResponse, CompletionService, EmbeddingRequest,
    EmbeddingResponse, EmbeddingService, Usage,
};
pub use query::{Answer, AskRequest, DEFAULT_TOP_K, Question};
pub use store::{ContextChunk, StoreHit, StoreStatus, VectorQuery, VectorStore};
