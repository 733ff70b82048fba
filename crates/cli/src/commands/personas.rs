//! `mascot personas` — List configured mascots.

use mascot_config::AppConfig;
use mascot_pipeline::PersonaRegistry;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = PersonaRegistry::from_config(&config.personas);
    let source = if config.personas.is_empty() {
        "built-in"
    } else {
        "config"
    };

    println!("Mascots ({source}):");
    for id in registry.ids() {
        let summary = registry
            .get(&id)
            .map(|p| first_sentence(&p.system_prompt))
            .unwrap_or_default();
        println!("  {id:<12} {summary}");
    }

    Ok(())
}

fn first_sentence(text: &str) -> String {
    let sentence = text.split_inclusive(". ").next().unwrap_or(text).trim();
    if sentence.chars().count() > 72 {
        let cut: String = sentence.chars().take(71).collect();
        format!("{cut}…")
    } else {
        sentence.to_string()
    }
}
