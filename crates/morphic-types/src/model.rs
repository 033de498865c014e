//! Search mode, model type, and model configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-selectable research strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// One optimized search, fast answer.
    #[default]
    Quick,
    /// Explicit task list, multiple searches and fetches.
    Planning,
    /// Chooses between quick and planning behavior per query.
    Adaptive,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Quick => write!(f, "quick"),
            SearchMode::Planning => write!(f, "planning"),
            SearchMode::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(SearchMode::Quick),
            "planning" => Ok(SearchMode::Planning),
            "adaptive" => Ok(SearchMode::Adaptive),
            other => Err(format!("invalid search mode: '{other}'")),
        }
    }
}

/// Speed/quality trade-off preferred by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Speed,
    Quality,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::Speed, ModelType::Quality];
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Speed => write!(f, "speed"),
            ModelType::Quality => write!(f, "quality"),
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speed" => Ok(ModelType::Speed),
            "quality" => Ok(ModelType::Quality),
            other => Err(format!("invalid model type: '{other}'")),
        }
    }
}

/// A concrete model served by a named provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: String,
    pub name: String,
    /// Display name of the provider (e.g. "OpenAI").
    pub provider: String,
    /// Registry key of the provider (e.g. "openai", "anthropic").
    pub provider_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_options: Option<serde_json::Value>,
}

impl ModelConfig {
    pub fn new(id: &str, name: &str, provider: &str, provider_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: provider.to_string(),
            provider_id: provider_id.to_string(),
            provider_options: None,
        }
    }

    /// `provider_id:id`, the form stored in message metadata.
    pub fn qualified_id(&self) -> String {
        format!("{}:{}", self.provider_id, self.id)
    }

    /// The fallback used when no configured model is available.
    pub fn default_model() -> Self {
        Self::new("gpt-5-mini", "GPT-5 mini", "OpenAI", "openai")
    }
}

/// Models for one search mode, keyed by model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeModels {
    pub speed: ModelConfig,
    pub quality: ModelConfig,
}

impl ModeModels {
    pub fn get(&self, model_type: ModelType) -> &ModelConfig {
        match model_type {
            ModelType::Speed => &self.speed,
            ModelType::Quality => &self.quality,
        }
    }
}

/// Model assignments, loaded from `models.toml` or built in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    pub version: u32,
    pub quick: ModeModels,
    pub adaptive: ModeModels,
    /// Planning falls back to the quick models when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning: Option<ModeModels>,
    pub related_questions: ModelConfig,
}

impl ModelsConfig {
    pub fn for_mode(&self, mode: SearchMode) -> &ModeModels {
        match mode {
            SearchMode::Quick => &self.quick,
            SearchMode::Adaptive => &self.adaptive,
            SearchMode::Planning => self.planning.as_ref().unwrap_or(&self.quick),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let quality = ModelConfig::new("claude-sonnet-4-20250514", "Claude Sonnet 4", "Anthropic", "anthropic");
        Self {
            version: 1,
            quick: ModeModels {
                speed: ModelConfig::new("gpt-5-nano", "GPT-5 nano", "OpenAI", "openai"),
                quality: quality.clone(),
            },
            adaptive: ModeModels {
                speed: ModelConfig::new("gpt-5-mini", "GPT-5 mini", "OpenAI", "openai"),
                quality: quality.clone(),
            },
            planning: Some(ModeModels {
                speed: ModelConfig::new("gpt-5", "GPT-5", "OpenAI", "openai"),
                quality,
            }),
            related_questions: ModelConfig::new("gemini-2.0-flash", "Gemini 2.0 Flash", "Google", "google"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_roundtrip() {
        for mode in [SearchMode::Quick, SearchMode::Planning, SearchMode::Adaptive] {
            assert_eq!(mode.to_string().parse::<SearchMode>().unwrap(), mode);
        }
        assert!("deep".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_model_type_serde() {
        assert_eq!(serde_json::to_string(&ModelType::Quality).unwrap(), "\"quality\"");
    }

    #[test]
    fn test_planning_falls_back_to_quick() {
        let config = ModelsConfig {
            planning: None,
            ..ModelsConfig::default()
        };
        assert_eq!(config.for_mode(SearchMode::Planning), &config.quick);
    }

    #[test]
    fn test_models_config_from_toml() {
        let toml_str = r#"
version = 1

[quick.speed]
id = "llama-3.1-8b-instant"
name = "Llama 3.1 8B"
provider = "Groq"
providerId = "groq"

[quick.quality]
id = "gpt-5"
name = "GPT-5"
provider = "OpenAI"
providerId = "openai"

[adaptive.speed]
id = "gpt-5-mini"
name = "GPT-5 mini"
provider = "OpenAI"
providerId = "openai"

[adaptive.quality]
id = "gpt-5"
name = "GPT-5"
provider = "OpenAI"
providerId = "openai"

[relatedQuestions]
id = "gpt-5-nano"
name = "GPT-5 nano"
provider = "OpenAI"
providerId = "openai"
"#;
        let config: ModelsConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quick.get(ModelType::Speed).provider_id, "groq");
        assert!(config.planning.is_none());
        assert_eq!(config.related_questions.qualified_id(), "openai:gpt-5-nano");
    }
}
