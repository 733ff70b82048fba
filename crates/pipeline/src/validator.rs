//! Request validation. Pure: no I/O, no shared state.
//!
//! Rules run in order and the first violation wins:
//! question length, `top_k` range, non-empty mascot, non-empty project.
//! Whether the mascot actually exists is decided later, after retrieval.

use mascot_core::error::{MAX_QUESTION_CHARS, MAX_TOP_K, MIN_TOP_K, ValidationError};
use mascot_core::query::{AskRequest, DEFAULT_TOP_K, Question};

/// Decode a raw JSON body into an [`AskRequest`].
pub fn parse_body(body: &[u8]) -> Result<AskRequest, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// Turn an untrusted request into a [`Question`].
pub fn validate(request: AskRequest) -> Result<Question, ValidationError> {
    let text = request.question.trim();
    let len = text.chars().count();
    if len == 0 || len > MAX_QUESTION_CHARS {
        return Err(ValidationError::QuestionLength(len));
    }

    let top_k = match request.top_k {
        None => DEFAULT_TOP_K,
        Some(k) if (MIN_TOP_K..=MAX_TOP_K).contains(&k) => k as usize,
        Some(k) => return Err(ValidationError::TopKOutOfRange(k)),
    };

    let persona = request.mascot.trim();
    if persona.is_empty() {
        return Err(ValidationError::EmptyPersona);
    }

    let project = request.project.trim();
    if project.is_empty() {
        return Err(ValidationError::EmptyProject);
    }

    Ok(Question {
        project: project.to_string(),
        persona: persona.to_string(),
        text: text.to_string(),
        top_k,
    })
}
