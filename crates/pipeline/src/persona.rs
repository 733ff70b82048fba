//! Read-only persona registry, built once at startup.

use mascot_config::PersonaConfig;
use mascot_core::persona::Persona;
use std::collections::BTreeMap;

const GOOEY: &str = "You are Gooey, a friendly and helpful gelatinous cube mascot for Terasology. \
You're enthusiastic about helping players and modders. You speak in a slightly quirky, \
encouraging way. Keep responses concise, helpful, and friendly.";

const BILL: &str = "You are Bill, a pragmatic and governance-focused pig mascot for Demicracy. \
You're knowledgeable about community governance, decision-making processes, and platform \
democracy. You speak clearly and helpfully, focusing on practical solutions. \
Keep responses concise and actionable.";

/// Keyed persona store. Ids are matched exactly.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl PersonaRegistry {
    /// The two built-in mascots.
    pub fn builtin() -> Self {
        Self::from_personas([Persona::new("gooey", GOOEY), Persona::new("bill", BILL)])
    }

    pub fn from_personas(personas: impl IntoIterator<Item = Persona>) -> Self {
        Self {
            personas: personas.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Personas from `[personas.<id>]`; the built-ins when none are configured.
    pub fn from_config(config: &BTreeMap<String, PersonaConfig>) -> Self {
        if config.is_empty() {
            return Self::builtin();
        }
        Self::from_personas(
            config
                .iter()
                .map(|(id, p)| Persona::new(id.clone(), p.system_prompt.trim())),
        )
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(id)
    }

    /// Sorted persona ids.
    pub fn ids(&self) -> Vec<String> {
        self.personas.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_gooey_and_bill() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.ids(), vec!["bill", "gooey"]);
        assert!(registry.get("gooey").unwrap().system_prompt.contains("Terasology"));
        assert!(registry.get("bill").unwrap().system_prompt.contains("Demicracy"));
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(PersonaRegistry::builtin().get("Gooey").is_none());
    }

    #[test]
    fn configured_personas_replace_builtins() {
        let mut config = BTreeMap::new();
        config.insert(
            "sprocket".to_string(),
            PersonaConfig {
                system_prompt: "  You are Sprocket.  ".into(),
            },
        );
        let registry = PersonaRegistry::from_config(&config);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("sprocket").unwrap().system_prompt, "You are Sprocket.");
        assert!(registry.get("gooey").is_none());
    }

    #[test]
    fn empty_config_falls_back_to_builtins() {
        assert_eq!(PersonaRegistry::from_config(&BTreeMap::new()).len(), 2);
    }
}
