//! Model service implementations for the mascot service.
//!
//! One OpenAI-compatible client serves both embedding and completion; the
//! retry helper wraps embedding calls, generation is never retried.

pub mod openai_compat;
pub mod retry;

pub use openai_compat::OpenAiCompatService;
pub use retry::{RetryFailure, RetryPolicy, retry_transient};
