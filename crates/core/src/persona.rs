//! Personas: named generation instructions ("mascots").

use serde::{Deserialize, Serialize};

/// A persona. Read-only reference data, looked up by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub system_prompt: String,
}

impl Persona {
    pub fn new(id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
        }
    }
}
