//! Provider registry for runtime provider lookup.
//!
//! Providers are registered under their registry key ("openai", "anthropic",
//! "google", ...). A provider is "enabled" exactly when it is registered,
//! which is what model selection consults.

use std::collections::HashMap;
use std::sync::Arc;

use morphic_types::llm::LlmError;
use morphic_types::model::ModelConfig;

use super::box_provider::BoxLlmProvider;

/// Registry of available LLM providers, indexed by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<BoxLlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under the given name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, provider: BoxLlmProvider) {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<Arc<BoxLlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// The provider serving `model`, or `ProviderNotConfigured`.
    pub fn for_model(&self, model: &ModelConfig) -> Result<Arc<BoxLlmProvider>, LlmError> {
        self.get(&model.provider_id)
            .ok_or_else(|| LlmError::ProviderNotConfigured(model.provider_id.clone()))
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// All registered provider names, sorted.
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    #[test]
    fn registered_provider_is_enabled() {
        let mut registry = ProviderRegistry::new();
        registry.register("openai", BoxLlmProvider::new(ScriptedProvider::text("openai", "hi")));
        assert!(registry.is_enabled("openai"));
        assert!(!registry.is_enabled("anthropic"));
        assert_eq!(registry.list_names(), vec!["openai"]);
    }

    #[test]
    fn for_model_reports_missing_provider() {
        let registry = ProviderRegistry::new();
        let model = ModelConfig::new("claude", "Claude", "Anthropic", "anthropic");
        match registry.for_model(&model) {
            Err(LlmError::ProviderNotConfigured(name)) => assert_eq!(name, "anthropic"),
            _ => panic!("expected ProviderNotConfigured"),
        }
    }
}
