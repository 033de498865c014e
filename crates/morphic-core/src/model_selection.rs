//! Model selection by search mode, preferred model type, and enabled
//! providers.

use tracing::warn;

use morphic_types::model::{ModelConfig, ModelType, ModelsConfig, SearchMode};

const MODE_FALLBACK_ORDER: [SearchMode; 2] = [SearchMode::Quick, SearchMode::Adaptive];

/// Pick the model for a request.
///
/// Candidates are tried mode-major: the requested mode (quick when absent)
/// then quick and adaptive; within a mode the preferred type, then speed,
/// then quality. The first candidate whose provider is enabled wins. When
/// none is, the default `gpt-5-mini` on openai is returned.
pub fn select_model(
    config: &ModelsConfig,
    mode: Option<SearchMode>,
    preferred_type: Option<ModelType>,
    is_enabled: impl Fn(&str) -> bool,
) -> ModelConfig {
    let requested = mode.unwrap_or_default();

    let mut types: Vec<ModelType> = preferred_type.into_iter().collect();
    for t in ModelType::ALL {
        if !types.contains(&t) {
            types.push(t);
        }
    }

    let mut modes = vec![requested];
    for m in MODE_FALLBACK_ORDER {
        if !modes.contains(&m) {
            modes.push(m);
        }
    }

    for m in &modes {
        for t in &types {
            let candidate = config.for_mode(*m).get(*t);
            if is_enabled(&candidate.provider_id) {
                return candidate.clone();
            }
            warn!(
                provider = %candidate.provider_id,
                mode = %m,
                model_type = %t,
                "provider not enabled, skipping model"
            );
        }
    }

    let fallback = ModelConfig::default_model();
    if !is_enabled(&fallback.provider_id) {
        warn!(provider = %fallback.provider_id, "default model provider is not enabled");
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(names: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |p| names.contains(&p)
    }

    #[test]
    fn requested_mode_and_type_win() {
        let config = ModelsConfig::default();
        let model = select_model(
            &config,
            Some(SearchMode::Planning),
            Some(ModelType::Speed),
            only(&["openai", "anthropic"]),
        );
        assert_eq!(model.id, "gpt-5");
    }

    #[test]
    fn preferred_quality_uses_anthropic() {
        let config = ModelsConfig::default();
        let model = select_model(
            &config,
            Some(SearchMode::Adaptive),
            Some(ModelType::Quality),
            only(&["openai", "anthropic"]),
        );
        assert_eq!(model.provider_id, "anthropic");
    }

    #[test]
    fn falls_back_to_speed_when_quality_provider_missing() {
        let config = ModelsConfig::default();
        let model = select_model(&config, Some(SearchMode::Adaptive), Some(ModelType::Quality), only(&["openai"]));
        assert_eq!(model.id, "gpt-5-mini");
    }

    #[test]
    fn missing_mode_means_quick() {
        let config = ModelsConfig::default();
        let model = select_model(&config, None, None, only(&["openai"]));
        assert_eq!(model.id, "gpt-5-nano");
    }

    #[test]
    fn falls_through_modes() {
        let mut config = ModelsConfig::default();
        config.quick.speed.provider_id = "groq".into();
        config.quick.quality.provider_id = "groq".into();
        let model = select_model(&config, Some(SearchMode::Quick), None, only(&["openai"]));
        assert_eq!(model.id, "gpt-5-mini");
    }

    #[test]
    fn default_when_nothing_enabled() {
        let config = ModelsConfig::default();
        let model = select_model(&config, Some(SearchMode::Quick), None, only(&[]));
        assert_eq!(model.id, "gpt-5-mini");
        assert_eq!(model.provider_id, "openai");
    }
}
