//! The query orchestrator: one request from admission to answer.
//!
//! Stages run in order; each may end the request early:
//!
//! ```text
//! Received   ── admit denied ──────▶ Rejected(RateLimited)
//! Admitted   ── invalid body ──────▶ Rejected(BadInput)
//! Validated  ── retrieval failed ──▶ Rejected(BackendUnavailable)
//! Retrieved  ── unknown persona ───▶ Rejected(PersonaNotFound)
//! Assembled  ── generation failed ─▶ Rejected(GenerationFailed)
//! Generated  ──────────────────────▶ Responded
//! ```
//!
//! Zero retrieved chunks is not a failure; the prompt goes out without
//! context.
//!
//! Component errors are folded into [`QueryError`] here and nowhere else.
//! Nothing is retried at this level; the retriever's embedding retry is the
//! only retry in the pipeline.

use crate::context::PromptAssembler;
use crate::generator::Generator;
use crate::persona::PersonaRegistry;
use crate::rate_gate::{Admission, RateGate};
use crate::validator;
use mascot_core::error::{QueryError, RetrievalError};
use mascot_core::query::{Answer, AskRequest, Question};
use mascot_core::store::StoreStatus;
use mascot_retrieval::Retriever;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Pipeline states, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Admitted,
    Validated,
    Retrieved,
    Assembled,
    Generated,
    Responded,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Admitted => "admitted",
            Self::Validated => "validated",
            Self::Retrieved => "retrieved",
            Self::Assembled => "assembled",
            Self::Generated => "generated",
            Self::Responded => "responded",
        };
        f.write_str(s)
    }
}

/// Tunables the orchestrator enforces.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub rate_limit_per_minute: u32,
    pub max_output_tokens: u32,
    /// Overall per-request deadline; stage timeouts are carved from it.
    pub request_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 10,
            max_output_tokens: 1024,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// The result of one `/ask-mascot` request, with its admission decision.
#[derive(Debug)]
pub struct QueryOutcome {
    pub admission: Admission,
    pub result: Result<Answer, QueryError>,
}

/// Reachability of the service's dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub vector_store: StoreStatus,
    pub generation: GenerationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatus {
    pub service: String,
    pub model: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composes the pipeline stages. Shared by `Arc` across request tasks.
pub struct QueryOrchestrator {
    gate: Arc<RateGate>,
    retriever: Retriever,
    personas: PersonaRegistry,
    assembler: PromptAssembler,
    generator: Generator,
    limits: Limits,
}

impl QueryOrchestrator {
    pub fn new(
        gate: Arc<RateGate>,
        retriever: Retriever,
        personas: PersonaRegistry,
        assembler: PromptAssembler,
        generator: Generator,
        limits: Limits,
    ) -> Self {
        Self {
            gate,
            retriever,
            personas,
            assembler,
            generator,
            limits,
        }
    }

    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn backend_name(&self) -> &str {
        self.retriever.store().name()
    }

    /// Handle a raw request body from `client_key`, admission first.
    pub async fn ask(&self, client_key: &str, body: &[u8]) -> QueryOutcome {
        debug!(stage = %Stage::Received, client = %client_key);

        let admission = self
            .gate
            .admit(client_key, self.limits.rate_limit_per_minute);
        if !admission.allowed {
            let err = QueryError::RateLimited {
                limit: admission.limit,
                retry_after_secs: admission.retry_after_secs,
            };
            log_rejection(&err);
            return QueryOutcome {
                admission,
                result: Err(err),
            };
        }
        debug!(stage = %Stage::Admitted, remaining = admission.remaining);

        let result = match validator::parse_body(body) {
            Ok(request) => self.answer(request).await,
            Err(e) => {
                let err = QueryError::BadInput(e);
                log_rejection(&err);
                Err(err)
            }
        };

        QueryOutcome { admission, result }
    }

    /// Validate and answer a decoded request. Admission is the caller's job.
    pub async fn answer(&self, request: AskRequest) -> Result<Answer, QueryError> {
        let question = validator::validate(request).map_err(|e| {
            let err = QueryError::BadInput(e);
            log_rejection(&err);
            err
        })?;
        debug!(stage = %Stage::Validated, top_k = question.top_k);
        debug!(question = %question.text, "Question text");

        self.answer_question(&question).await.inspect_err(log_rejection)
    }

    async fn answer_question(&self, question: &Question) -> Result<Answer, QueryError> {
        let started = Instant::now();
        let deadline = self.limits.request_timeout;

        // Retrieval may use at most half the request deadline.
        let retrieval_slice = deadline / 2;
        let chunks = match tokio::time::timeout(retrieval_slice, self.retriever.retrieve(question))
            .await
        {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(e)) => return Err(backend_unavailable(e)),
            Err(_) => {
                return Err(backend_unavailable(RetrievalError::Timeout(
                    retrieval_slice.as_millis() as u64,
                )));
            }
        };
        debug!(stage = %Stage::Retrieved, chunks = chunks.len());

        let persona = self
            .personas
            .get(&question.persona)
            .ok_or_else(|| QueryError::PersonaNotFound {
                persona: question.persona.clone(),
                available: self.personas.ids(),
            })?;

        let prompt = self.assembler.assemble(persona, &chunks, question);
        debug!(
            stage = %Stage::Assembled,
            used = prompt.used_chunk_ids.len(),
            estimated_tokens = prompt.estimated_tokens,
            budget = prompt.budget,
        );
        trace!(prompt = %prompt.render(), "Assembled prompt");

        let remaining = deadline.saturating_sub(started.elapsed());
        let answer = self
            .generator
            .generate_within(&prompt, self.limits.max_output_tokens, remaining)
            .await?;
        debug!(stage = %Stage::Generated, answer_chars = answer.text.chars().count());

        info!(
            stage = %Stage::Responded,
            project = %question.project,
            persona = %question.persona,
            top_k = question.top_k,
            retrieved = chunks.len(),
            used = answer.used_chunk_ids.len(),
            confidence = answer.confidence.unwrap_or(0.0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );
        Ok(answer)
    }

    /// Probe the vector store and the generation service.
    pub async fn health(&self) -> HealthReport {
        let vector_store = self.retriever.store().status().await;

        let service = self.generator.service();
        let (reachable, error) = match service.health_check().await {
            Ok(true) => (true, None),
            Ok(false) => (false, Some("health check returned unhealthy".to_string())),
            Err(e) => (false, Some(e.to_string())),
        };

        HealthReport {
            healthy: vector_store.reachable && reachable,
            vector_store,
            generation: GenerationStatus {
                service: service.name().to_string(),
                model: self.generator.model().to_string(),
                reachable,
                error,
            },
        }
    }
}

fn backend_unavailable(e: RetrievalError) -> QueryError {
    QueryError::BackendUnavailable(e.to_string())
}

fn log_rejection(err: &QueryError) {
    match err {
        QueryError::RateLimited {
            retry_after_secs, ..
        } => info!(kind = err.kind(), retry_after_secs, "Request rejected"),
        QueryError::BadInput(e) => info!(kind = err.kind(), reason = %e, "Request rejected"),
        QueryError::PersonaNotFound { persona, .. } => {
            warn!(kind = err.kind(), %persona, "Request rejected")
        }
        QueryError::BackendUnavailable(reason) => {
            error!(kind = err.kind(), %reason, "Request failed")
        }
        QueryError::GenerationFailed(e) => error!(kind = err.kind(), error = %e, "Request failed"),
    }
}
