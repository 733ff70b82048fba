//! Wire shapes and the `QueryError` → HTTP mapping.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use mascot_core::error::{GenerationError, QueryError};
use mascot_core::query::Answer;
use mascot_pipeline::{Admission, QueryOutcome};
use serde::Serialize;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// `200` body of `POST /ask-mascot`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            sources: answer.used_chunk_ids,
            confidence: answer.confidence,
        }
    }
}

/// Body of every rejection.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub fn status_for(err: &QueryError) -> StatusCode {
    match err {
        QueryError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        QueryError::BadInput(_) | QueryError::PersonaNotFound { .. } => StatusCode::BAD_REQUEST,
        QueryError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::GenerationFailed(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        QueryError::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing detail. Backend and generation failures get fixed text;
/// the underlying error is only logged.
pub fn public_detail(err: &QueryError) -> String {
    match err {
        QueryError::RateLimited { .. }
        | QueryError::BadInput(_)
        | QueryError::PersonaNotFound { .. } => err.to_string(),
        QueryError::BackendUnavailable(_) => {
            "The knowledge base is temporarily unavailable. Please try again later.".into()
        }
        QueryError::GenerationFailed(GenerationError::Timeout(_)) => {
            "The answer took too long to generate. Please try again.".into()
        }
        QueryError::GenerationFailed(_) => "Failed to generate an answer.".into(),
    }
}

/// Render a pipeline outcome, including rate-limit headers.
pub fn ask_response(outcome: QueryOutcome) -> Response {
    let mut response = match outcome.result {
        Ok(answer) => (StatusCode::OK, Json(AskResponse::from(answer))).into_response(),
        Err(err) => (
            status_for(&err),
            Json(ErrorBody {
                detail: public_detail(&err),
            }),
        )
            .into_response(),
    };
    insert_rate_limit_headers(response.headers_mut(), &outcome.admission);
    response
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(admission.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(admission.remaining));
    if !admission.allowed {
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(admission.retry_after_secs),
        );
    }
}
