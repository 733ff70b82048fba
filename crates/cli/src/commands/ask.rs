//! `mascot ask` — Run the pipeline once from the terminal.

use mascot_config::AppConfig;
use mascot_core::query::AskRequest;

pub async fn run(
    config: AppConfig,
    project: String,
    mascot: String,
    top_k: Option<i64>,
    question: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = mascot_pipeline::builder::from_config(&config)?;

    let answer = orchestrator
        .answer(AskRequest {
            project,
            mascot: mascot.clone(),
            question,
            top_k,
        })
        .await?;

    println!("{mascot}: {}", answer.text);
    if !answer.used_chunk_ids.is_empty() {
        println!();
        println!("Sources:");
        for id in &answer.used_chunk_ids {
            println!("  - {id}");
        }
    }
    if let Some(confidence) = answer.confidence {
        println!("Confidence: {confidence:.2}");
    }

    Ok(())
}
