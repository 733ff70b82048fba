//! Token-budgeted prompt assembly.
//!
//! | Part | Source | Trim Strategy |
//! |------|--------|---------------|
//! | Persona | Persona registry | Never trimmed |
//! | Context | Retriever output | Stop at first chunk that overflows |
//! | Question | Request | Never trimmed |

pub mod assembler;
pub mod token;

pub use assembler::{DropInfo, PromptAssembler};
