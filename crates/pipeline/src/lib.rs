//! The query pipeline: one question from admission to grounded answer.
//!
//! Every request moves through the same stages:
//!
//! 1. **Admit** against the per-client rate gate
//! 2. **Validate** the request body into a [`Question`](mascot_core::query::Question)
//! 3. **Retrieve** context chunks for the question's project
//! 4. **Resolve** the persona
//! 5. **Assemble** a prompt under the input-token budget
//! 6. **Generate** exactly one completion
//!
//! [`QueryOrchestrator`] owns the sequence and translates component errors
//! into [`QueryError`](mascot_core::error::QueryError).

pub mod builder;
pub mod context;
pub mod generator;
pub mod orchestrator;
pub mod persona;
pub mod rate_gate;
pub mod validator;

#[cfg(test)]
mod test_helpers;

pub use builder::BuildError;
pub use context::{DropInfo, PromptAssembler};
pub use generator::Generator;
pub use orchestrator::{GenerationStatus, HealthReport, Limits, QueryOrchestrator, QueryOutcome, Stage};
pub use persona::PersonaRegistry;
pub use rate_gate::{Admission, RateGate};
