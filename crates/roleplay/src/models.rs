//! Reward framework assembly from project configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use roleplay_reward::models::{
    BlacklistRewardModel, HttpScorer, ScorerRewardModel, TaskValidatorRewardModel,
};
use roleplay_reward::{RewardFramework, RewardModelType};

use crate::config::ProjectConfig;

/// Register the built-in filters plus every configured HTTP scorer.
pub fn build_framework(config: &ProjectConfig) -> Result<RewardFramework> {
    let weights = config.reward_weights()?;
    let mut framework = RewardFramework::new(weights);

    if framework.config().is_enabled(RewardModelType::TaskValidator) {
        framework = framework.with_model(Arc::new(TaskValidatorRewardModel::new()));
    }
    if framework.config().is_enabled(RewardModelType::Blacklist) {
        let blacklist = match config.reward.blacklist {
            Some(ref phrases) => BlacklistRewardModel::with_phrases(phrases.iter().cloned()),
            None => BlacklistRewardModel::new(),
        };
        framework = framework.with_model(Arc::new(blacklist));
    }

    for (name, scorer_config) in &config.reward.scorers {
        let model_type: RewardModelType = name
            .parse()
            .with_context(|| format!("Invalid scorer name [reward.scorers.{}]", name))?;
        if matches!(
            model_type,
            RewardModelType::TaskValidator | RewardModelType::Blacklist
        ) {
            anyhow::bail!("{} is built in and cannot be served by a scorer", model_type);
        }

        let scorer = HttpScorer::new(scorer_config.endpoint.clone(), scorer_config.timeout())
            .with_context(|| format!("Invalid scorer {}", name))?;
        let mut model = ScorerRewardModel::new(model_type, scorer, scorer_config.normalization);
        if let Some(ref task_types) = scorer_config.task_types {
            model = model.only_for(task_types.iter().cloned());
        }
        info!(model = %model_type, endpoint = %scorer_config.endpoint, "Registered scorer");
        framework = framework.with_model(Arc::new(model));
    }

    for (model_type, weight) in framework.config().enabled() {
        let registered = framework
            .models()
            .iter()
            .any(|m| m.model_type() == model_type);
        if !registered {
            warn!(
                model = %model_type,
                weight,
                "Weighted reward model has no implementation and is skipped"
            );
        }
    }

    Ok(framework)
}

/// Whether any registered model will actually run
pub fn has_active_models(framework: &RewardFramework) -> bool {
    framework
        .models()
        .iter()
        .any(|m| framework.config().is_enabled(m.model_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config_with_weights(weights: &[(&str, f64)]) -> ProjectConfig {
        let mut config = ProjectConfig::default();
        config.reward.weights = Some(
            weights
                .iter()
                .map(|(name, w)| (name.to_string(), *w))
                .collect::<BTreeMap<_, _>>(),
        );
        config
    }

    #[test]
    fn test_builtin_filters_are_registered_when_weighted() {
        let config = config_with_weights(&[("task_validator_filter", 0.7), ("blacklist_filter", 0.3)]);
        let framework = build_framework(&config).unwrap();
        assert_eq!(framework.models().len(), 2);
        assert!(has_active_models(&framework));
    }

    #[test]
    fn test_defaults_have_no_active_models() {
        let framework = build_framework(&ProjectConfig::default()).unwrap();
        assert!(framework.models().is_empty());
        assert!(!has_active_models(&framework));
    }

    #[test]
    fn test_scorer_name_must_be_a_model() {
        let mut config = config_with_weights(&[("task_validator_filter", 1.0)]);
        let toml = r#"
[scorers.not_a_model]
endpoint = "http://localhost:9000"
"#;
        config.reward.scorers = toml::from_str::<ScorersOnly>(toml).unwrap().scorers;
        assert!(build_framework(&config).is_err());
    }

    #[derive(serde::Deserialize)]
    struct ScorersOnly {
        scorers: BTreeMap<String, crate::config::ScorerConfig>,
    }
}
