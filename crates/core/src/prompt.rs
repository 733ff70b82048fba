//! The assembled, token-bounded prompt.

use serde::{Deserialize, Serialize};

/// Instruction line placed between the persona and the context block.
pub const GROUNDING_INSTRUCTION: &str = "Use the following context from the project documentation to answer the user's question.\nIf the context doesn't contain enough information, say so honestly.";

/// Render the user turn: instruction, context block, question, answer cue.
pub fn render_user_message(context_block: &str, question: &str) -> String {
    format!("{GROUNDING_INSTRUCTION}\n\nContext:\n{context_block}\n\nQuestion: {question}\n\nAnswer:")
}

/// A prompt ready for the completion service.
///
/// Invariant: `estimated_tokens <= budget` unless the persona and question
/// alone exceed it, in which case `context_block` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    pub context_block: String,
    pub question: String,
    /// Ids of the chunks rendered into `context_block`, in order.
    pub used_chunk_ids: Vec<String>,
    /// Relevance of each used chunk, parallel to `used_chunk_ids`.
    #[serde(default)]
    pub used_scores: Vec<f32>,
    pub estimated_tokens: usize,
    pub budget: usize,
}

impl AssembledPrompt {
    /// The user turn sent after the system prompt.
    pub fn user_message(&self) -> String {
        render_user_message(&self.context_block, &self.question)
    }

    /// The whole prompt as a single text: persona, then the user turn.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system_prompt, self.user_message())
    }

    /// Whether any retrieved context survived budgeting.
    pub fn has_context(&self) -> bool {
        !self.used_chunk_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> AssembledPrompt {
        AssembledPrompt {
            system_prompt: "You are Gooey.".into(),
            context_block: "From intro.md:\nBifrost is a bridge.".into(),
            question: "What is Bifrost?".into(),
            used_chunk_ids: vec!["c1".into()],
            used_scores: vec![0.9],
            estimated_tokens: 40,
            budget: 4096,
        }
    }

    #[test]
    fn user_message_layout() {
        let msg = prompt().user_message();
        assert!(msg.starts_with("Use the following context"));
        assert!(msg.contains("Context:\nFrom intro.md:\nBifrost is a bridge."));
        assert!(msg.ends_with("Question: What is Bifrost?\n\nAnswer:"));
        assert!(prompt().has_context());
    }

    #[test]
    fn render_puts_persona_first() {
        let text = prompt().render();
        assert!(text.starts_with("You are Gooey.\n\nUse the following context"));
        assert!(text.ends_with("Answer:"));
    }
}
