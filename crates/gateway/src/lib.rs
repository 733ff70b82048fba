//! HTTP surface for the mascot RAG service.
//!
//! Routes:
//! - `POST /ask-mascot`: ask a persona a question about a project
//! - `GET /health`: dependency reachability, exempt from rate limiting
//! - `GET /`: service banner
//!
//! Built on Axum. Admission, validation and error translation happen in
//! [`QueryOrchestrator`]; this crate only maps outcomes onto HTTP.

pub mod client;
pub mod reply;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::{
    Router,
    routing::{get, post},
};
use mascot_config::AppConfig;
use mascot_pipeline::{HealthReport, QueryOrchestrator};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span};

pub use client::ClientKey;

/// Request body ceiling for every route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const SERVICE_NAME: &str = "Uplifted Mascot RAG Service";

type SharedState = Arc<QueryOrchestrator>;

/// Build the Axum router around a ready orchestrator.
///
/// Layers applied:
/// - permissive CORS, so the static frontend can call from any origin
/// - 64 KiB request body limit
/// - HTTP trace logging
pub fn build_router(orchestrator: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ask-mascot", post(ask_handler))
        .with_state(orchestrator)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server and the rate-limit sweeper.
pub async fn start(
    config: &AppConfig,
    orchestrator: Arc<QueryOrchestrator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    spawn_sweeper(
        orchestrator.clone(),
        Duration::from_secs(config.server.rate_limit_sweep_secs.max(1)),
    );

    let app = build_router(orchestrator.clone());

    info!(
        addr = %addr,
        backend = orchestrator.backend_name(),
        rate_limit_per_minute = orchestrator.limits().rate_limit_per_minute,
        "Mascot service starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically evict expired rate-limit buckets.
fn spawn_sweeper(orchestrator: Arc<QueryOrchestrator>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = orchestrator.gate().sweep();
            if evicted > 0 {
                debug!(
                    evicted,
                    tracked = orchestrator.gate().tracked_clients(),
                    "Rate-limit buckets swept"
                );
            }
        }
    });
}

// --- Handlers ---

async fn ask_handler(
    State(orchestrator): State<SharedState>,
    ClientKey(client): ClientKey,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("ask_mascot", %request_id, %client);
    let outcome = orchestrator.ask(&client, &body).instrument(span).await;
    reply::ask_response(outcome)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(flatten)]
    report: HealthReport,
}

async fn health_handler(State(orchestrator): State<SharedState>) -> Response {
    let report = orchestrator.health().await;
    let (code, status) = if report.healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            report,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    status: &'static str,
    version: &'static str,
    backend: String,
}

async fn root_handler(State(orchestrator): State<SharedState>) -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME,
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        backend: orchestrator.backend_name().to_string(),
    })
}
