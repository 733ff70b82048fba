//! Prompt assembly under a hard input-token ceiling.
//!
//! Layout of the prompt sent to the model:
//!
//! 1. **Persona** (system message): never trimmed
//! 2. **Instruction**: fixed grounding text
//! 3. **Context**: retrieved chunks as `From <source>:\n<text>` entries
//! 4. **Question**: never trimmed
//!
//! # Determinism
//!
//! Greedy and order-preserving: chunks are taken in the order given (best
//! first) until the next one would overflow the budget, then assembly stops.
//! No reordering, no partial chunks. Identical inputs always produce
//! identical prompts.

use crate::context::token;
use mascot_core::persona::Persona;
use mascot_core::prompt::{AssembledPrompt, render_user_message};
use mascot_core::query::Question;
use mascot_core::store::ContextChunk;
use tracing::{debug, warn};

/// Separator between context entries.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Render one chunk as it appears in the context block.
pub fn render_chunk(chunk: &ContextChunk) -> String {
    format!("From {}:\n{}", chunk.source_label(), chunk.text)
}

/// Estimated cost of one chunk, separator included.
pub fn chunk_tokens(chunk: &ContextChunk) -> usize {
    token::estimate_tokens(&render_chunk(chunk)) + token::estimate_tokens(ENTRY_SEPARATOR)
}

/// Estimated cost of the scaffolding text around context and question.
pub fn template_overhead_tokens() -> usize {
    token::estimate_tokens(&render_user_message("", ""))
}

/// Information about chunks left out of the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropInfo {
    pub count: usize,
    pub tokens: usize,
    pub first_dropped: String,
}

/// Builds [`AssembledPrompt`]s against a fixed token budget.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    budget: usize,
}

impl PromptAssembler {
    /// Create an assembler with `budget` = `MAX_INPUT_TOKENS`.
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Tokens consumed before any context: persona, question, scaffolding.
    pub fn fixed_tokens(&self, persona: &Persona, question: &Question) -> usize {
        token::estimate_all([persona.system_prompt.as_str(), question.text.as_str()])
            + template_overhead_tokens()
    }

    /// Assemble the prompt. Cannot fail; worst case the context is empty.
    pub fn assemble(
        &self,
        persona: &Persona,
        chunks: &[ContextChunk],
        question: &Question,
    ) -> AssembledPrompt {
        let fixed = self.fixed_tokens(persona, question);

        if fixed > self.budget {
            warn!(
                fixed_tokens = fixed,
                budget = self.budget,
                persona = %persona.id,
                "Persona and question exceed the input budget; sending without context"
            );
            return AssembledPrompt {
                system_prompt: persona.system_prompt.clone(),
                context_block: String::new(),
                question: question.text.clone(),
                used_chunk_ids: Vec::new(),
                used_scores: Vec::new(),
                estimated_tokens: fixed,
                budget: self.budget,
            };
        }

        let mut total = fixed;
        let mut entries = Vec::new();
        let mut used_chunk_ids = Vec::new();
        let mut used_scores = Vec::new();
        let mut drop: Option<DropInfo> = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let cost = chunk_tokens(chunk);
            if total + cost > self.budget {
                let rest = &chunks[i..];
                drop = Some(DropInfo {
                    count: rest.len(),
                    tokens: rest.iter().map(chunk_tokens).sum(),
                    first_dropped: chunk.id.clone(),
                });
                break;
            }
            total += cost;
            entries.push(render_chunk(chunk));
            used_chunk_ids.push(chunk.id.clone());
            used_scores.push(chunk.relevance_score);
        }

        if let Some(info) = &drop {
            debug!(
                dropped = info.count,
                dropped_tokens = info.tokens,
                first_dropped = %info.first_dropped,
                budget = self.budget,
                "Context truncated to fit budget"
            );
        }

        AssembledPrompt {
            system_prompt: persona.system_prompt.clone(),
            context_block: entries.join(ENTRY_SEPARATOR),
            question: question.text.clone(),
            used_chunk_ids,
            used_scores,
            estimated_tokens: total,
            budget: self.budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn question(text: &str) -> Question {
        Question {
            project: "bifrost".into(),
            persona: "gooey".into(),
            text: text.into(),
            top_k: 5,
        }
    }

    /// A chunk whose rendered cost is exactly `tokens`.
    fn chunk_costing(id: &str, tokens: usize) -> ContextChunk {
        let prefix = format!("From {id}:\n").chars().count();
        let text_len = (tokens - 1) * 4 - prefix;
        let chunk = ContextChunk {
            id: id.into(),
            text: "x".repeat(text_len),
            source_metadata: BTreeMap::new(),
            relevance_score: 0.5,
        };
        assert_eq!(chunk_tokens(&chunk), tokens);
        chunk
    }

    /// A persona that brings the fixed part to exactly `fixed` tokens.
    fn persona_for_fixed(fixed: usize, q: &Question) -> Persona {
        let persona_tokens = fixed - template_overhead_tokens() - token::estimate_tokens(&q.text);
        Persona::new("gooey", "p".repeat(persona_tokens * 4))
    }

    #[test]
    fn greedy_fill_stops_at_first_overflow() {
        let q = question("What is Bifrost?");
        let persona = persona_for_fixed(100, &q);
        let assembler = PromptAssembler::new(600);
        assert_eq!(assembler.fixed_tokens(&persona, &q), 100);

        let chunks = vec![
            chunk_costing("c1", 200),
            chunk_costing("c2", 200),
            chunk_costing("c3", 5000),
        ];
        let prompt = assembler.assemble(&persona, &chunks, &q);

        assert_eq!(prompt.used_chunk_ids, vec!["c1", "c2"]);
        assert_eq!(prompt.estimated_tokens, 500);
        assert!(prompt.estimated_tokens <= 600);
    }

    #[test]
    fn smaller_later_chunk_is_not_pulled_forward() {
        let q = question("What is Bifrost?");
        let persona = persona_for_fixed(100, &q);
        let assembler = PromptAssembler::new(600);

        let chunks = vec![
            chunk_costing("c1", 200),
            chunk_costing("big", 400),
            chunk_costing("small", 50),
        ];
        let prompt = assembler.assemble(&persona, &chunks, &q);
        assert_eq!(prompt.used_chunk_ids, vec!["c1"]);
    }

    #[test]
    fn exact_fit_is_included() {
        let q = question("What is Bifrost?");
        let persona = persona_for_fixed(100, &q);
        let prompt = PromptAssembler::new(300).assemble(&persona, &[chunk_costing("c1", 200)], &q);
        assert_eq!(prompt.used_chunk_ids, vec!["c1"]);
        assert_eq!(prompt.estimated_tokens, 300);
    }

    #[test]
    fn oversized_fixed_part_yields_empty_context() {
        let q = question(&"q".repeat(1000));
        let persona = Persona::new("gooey", "p".repeat(4000));
        let assembler = PromptAssembler::new(200);

        let prompt = assembler.assemble(&persona, &[chunk_costing("c1", 10)], &q);
        assert!(prompt.context_block.is_empty());
        assert!(prompt.used_chunk_ids.is_empty());
        assert_eq!(prompt.question, q.text);
    }

    #[test]
    fn no_chunks_produces_context_free_prompt() {
        let q = question("What is Bifrost?");
        let prompt = PromptAssembler::new(4096).assemble(&Persona::new("gooey", "You are Gooey."), &[], &q);
        assert!(!prompt.has_context());
        assert!(prompt.user_message().contains("Question: What is Bifrost?"));
    }

    #[test]
    fn context_block_uses_source_labels() {
        let q = question("What is Bifrost?");
        let mut meta = BTreeMap::new();
        meta.insert("file_path".to_string(), "docs/bifrost/intro.md".to_string());
        let chunks = vec![
            ContextChunk {
                id: "a".into(),
                text: "Bifrost is a bridge.".into(),
                source_metadata: meta,
                relevance_score: 0.9,
            },
            ContextChunk {
                id: "b".into(),
                text: "It connects realms.".into(),
                source_metadata: BTreeMap::new(),
                relevance_score: 0.8,
            },
        ];
        let prompt =
            PromptAssembler::new(4096).assemble(&Persona::new("gooey", "You are Gooey."), &chunks, &q);
        assert_eq!(
            prompt.context_block,
            "From intro.md:\nBifrost is a bridge.\n\nFrom b:\nIt connects realms."
        );
        assert_eq!(prompt.used_scores, vec![0.9, 0.8]);
    }

    #[test]
    fn estimate_bounds_rendered_text() {
        let q = question("What is Bifrost?");
        let persona = Persona::new("gooey", "You are Gooey.");
        let chunks: Vec<_> = (0..5).map(|i| chunk_costing(&format!("c{i}"), 30)).collect();
        let prompt = PromptAssembler::new(4096).assemble(&persona, &chunks, &q);
        assert!(prompt.estimated_tokens >= token::estimate_all([
            persona.system_prompt.as_str(),
            prompt.user_message().as_str()
        ]));
    }
}
