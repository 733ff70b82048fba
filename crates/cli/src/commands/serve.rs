//! `mascot serve` — Start the HTTP service.

use mascot_config::{AppConfig, VectorBackend};
use std::sync::Arc;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let orchestrator = mascot_pipeline::builder::from_config(&config)?;

    println!("🐸 Uplifted Mascot");
    println!("   Listening: {}:{}", config.server.host, config.server.port);
    match config.vector.backend() {
        VectorBackend::Local => {
            println!("   Vector store: local ({})", config.vector.local_db_path().display())
        }
        VectorBackend::Remote => println!(
            "   Vector store: chroma ({})",
            config.vector.chroma_base_url().unwrap_or_default()
        ),
        VectorBackend::Managed => println!(
            "   Vector store: managed (endpoint {})",
            config.vector.endpoint_id.as_deref().unwrap_or("?")
        ),
    }
    println!("   Mascots: {}", orchestrator.personas().ids().join(", "));
    println!(
        "   Rate limit: {} per minute per client",
        config.limits.rate_limit_per_minute
    );

    mascot_gateway::start(&config, Arc::new(orchestrator)).await?;

    Ok(())
}
