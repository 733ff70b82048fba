//! `mascot doctor` — Check configuration and dependency reachability.

use mascot_config::{AppConfig, ConfigError, VectorBackend};

pub async fn run(loaded: Result<AppConfig, ConfigError>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Mascot Doctor — Service Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config = match loaded {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running other checks.");
            return Ok(());
        }
    };

    if config.llm.api_key.is_some() {
        println!("  ✅ Generation API key configured");
    } else {
        println!("  ⚠️  No LLM_API_KEY set — only keyless endpoints will work");
        issues += 1;
    }

    match config.vector.backend() {
        VectorBackend::Local => {
            let path = config.vector.local_db_path();
            if path.exists() {
                println!("  ✅ Local vector database found at {}", path.display());
            } else {
                println!("  ❌ No local vector database at {} — run ingestion first", path.display());
                issues += 1;
            }
        }
        VectorBackend::Remote => println!(
            "  ✅ Chroma vector backend selected ({})",
            config.vector.chroma_base_url().unwrap_or_default()
        ),
        VectorBackend::Managed => println!("  ✅ Managed vector backend selected"),
    }

    let orchestrator = match mascot_pipeline::builder::from_config(&config) {
        Ok(o) => o,
        Err(e) => {
            println!("  ❌ Pipeline could not be built: {e}");
            println!("\n  ⚠️  {} issue(s) found. See above for details.", issues + 1);
            return Ok(());
        }
    };
    println!("  ✅ Mascots: {}", orchestrator.personas().ids().join(", "));

    let health = orchestrator.health().await;
    let store = &health.vector_store;
    if store.reachable {
        let count = store
            .chunk_count
            .map(|c| format!("{c} chunks"))
            .unwrap_or_else(|| "count unknown".into());
        println!("  ✅ Vector store '{}' reachable ({count})", store.collection);
    } else {
        println!(
            "  ❌ Vector store unreachable: {}",
            store.error.as_deref().unwrap_or("unknown error")
        );
        issues += 1;
    }

    let generation = &health.generation;
    if generation.reachable {
        println!("  ✅ Generation service reachable (model {})", generation.model);
    } else {
        println!(
            "  ❌ Generation service unreachable: {}",
            generation.error.as_deref().unwrap_or("unknown error")
        );
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
