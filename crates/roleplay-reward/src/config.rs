use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed distance of the enabled weight sum from 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Identity of every reward mechanism the framework knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RewardModelType {
    #[serde(rename = "dpo_reward_model")]
    Dpo,
    #[serde(rename = "rlhf_reward_model")]
    Rlhf,
    #[serde(rename = "reciprocate_reward_model")]
    Reciprocate,
    #[serde(rename = "dahoas_reward_model")]
    Dahoas,
    #[serde(rename = "mistral_reward_model")]
    Mistral,
    #[serde(rename = "diversity_reward_model")]
    Diversity,
    #[serde(rename = "prompt_reward_model")]
    Prompt,
    #[serde(rename = "blacklist_filter")]
    Blacklist,
    #[serde(rename = "nsfw_filter")]
    Nsfw,
    #[serde(rename = "relevance_filter")]
    Relevance,
    #[serde(rename = "relevance_bert")]
    RelevanceBert,
    #[serde(rename = "relevance_mpnet")]
    RelevanceMpnet,
    #[serde(rename = "task_validator_filter")]
    TaskValidator,
}

impl RewardModelType {
    pub const ALL: [RewardModelType; 13] = [
        RewardModelType::Dpo,
        RewardModelType::Rlhf,
        RewardModelType::Reciprocate,
        RewardModelType::Dahoas,
        RewardModelType::Mistral,
        RewardModelType::Diversity,
        RewardModelType::Prompt,
        RewardModelType::Blacklist,
        RewardModelType::Nsfw,
        RewardModelType::Relevance,
        RewardModelType::RelevanceBert,
        RewardModelType::RelevanceMpnet,
        RewardModelType::TaskValidator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RewardModelType::Dpo => "dpo_reward_model",
            RewardModelType::Rlhf => "rlhf_reward_model",
            RewardModelType::Reciprocate => "reciprocate_reward_model",
            RewardModelType::Dahoas => "dahoas_reward_model",
            RewardModelType::Mistral => "mistral_reward_model",
            RewardModelType::Diversity => "diversity_reward_model",
            RewardModelType::Prompt => "prompt_reward_model",
            RewardModelType::Blacklist => "blacklist_filter",
            RewardModelType::Nsfw => "nsfw_filter",
            RewardModelType::Relevance => "relevance_filter",
            RewardModelType::RelevanceBert => "relevance_bert",
            RewardModelType::RelevanceMpnet => "relevance_mpnet",
            RewardModelType::TaskValidator => "task_validator_filter",
        }
    }
}

impl std::fmt::Display for RewardModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RewardModelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownModel(s.to_string()))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unknown reward model: {0}")]
    UnknownModel(String),

    #[error("Invalid weight {weight} for {model}: weights must be finite and within [0, 1]")]
    InvalidWeight { model: RewardModelType, weight: f64 },

    #[error("Enabled reward model weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    #[error("No reward model has a positive weight")]
    NoModelsEnabled,
}

/// Weight of each reward model in the final reward.
///
/// Construction validates that every weight is finite and in `[0, 1]` and
/// that the enabled (positive) weights sum to 1.0. Models without an entry
/// have weight 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardFrameworkConfig {
    weights: BTreeMap<RewardModelType, f64>,
}

impl RewardFrameworkConfig {
    pub fn new(
        weights: impl IntoIterator<Item = (RewardModelType, f64)>,
    ) -> Result<Self, ConfigError> {
        let weights: BTreeMap<RewardModelType, f64> = weights.into_iter().collect();

        for (&model, &weight) in &weights {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidWeight { model, weight });
            }
        }

        let sum: f64 = weights.values().filter(|w| **w > 0.0).sum();
        if sum == 0.0 {
            return Err(ConfigError::NoModelsEnabled);
        }
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(Self { weights })
    }

    /// Build from a table keyed by reward model name (as found in config files)
    pub fn from_named(weights: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let parsed = weights
            .iter()
            .map(|(name, weight)| Ok((name.parse::<RewardModelType>()?, *weight)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::new(parsed)
    }

    pub fn weight(&self, model: RewardModelType) -> f64 {
        self.weights.get(&model).copied().unwrap_or(0.0)
    }

    pub fn is_enabled(&self, model: RewardModelType) -> bool {
        self.weight(model) > 0.0
    }

    pub fn weights(&self) -> &BTreeMap<RewardModelType, f64> {
        &self.weights
    }

    /// Models with a positive weight
    pub fn enabled(&self) -> impl Iterator<Item = (RewardModelType, f64)> + '_ {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(m, w)| (*m, *w))
    }
}

impl Default for RewardFrameworkConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (RewardModelType::Dpo, 0.2),
                (RewardModelType::Rlhf, 0.4),
                (RewardModelType::Reciprocate, 0.4),
                (RewardModelType::Dahoas, 0.0),
                (RewardModelType::Prompt, 0.0),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RewardFrameworkConfig::default();
        let rebuilt = RewardFrameworkConfig::new(config.weights().clone()).unwrap();
        assert_eq!(rebuilt, config);
        assert_eq!(config.weight(RewardModelType::Rlhf), 0.4);
        assert_eq!(config.weight(RewardModelType::Nsfw), 0.0);
        assert_eq!(config.enabled().count(), 3);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let result = RewardFrameworkConfig::new([
            (RewardModelType::Rlhf, 0.5),
            (RewardModelType::Dpo, 0.4),
        ]);
        assert!(matches!(result, Err(ConfigError::WeightSum { .. })));
    }

    #[test]
    fn test_disabled_models_are_allowed() {
        let config = RewardFrameworkConfig::new([
            (RewardModelType::TaskValidator, 1.0),
            (RewardModelType::Nsfw, 0.0),
        ])
        .unwrap();
        assert!(config.is_enabled(RewardModelType::TaskValidator));
        assert!(!config.is_enabled(RewardModelType::Nsfw));
    }

    #[test]
    fn test_rejects_invalid_weights() {
        assert!(matches!(
            RewardFrameworkConfig::new([(RewardModelType::Dpo, f64::NAN)]),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert!(matches!(
            RewardFrameworkConfig::new([(RewardModelType::Dpo, 1.5)]),
            Err(ConfigError::InvalidWeight { .. })
        ));
        assert_eq!(
            RewardFrameworkConfig::new([(RewardModelType::Dpo, 0.0)]),
            Err(ConfigError::NoModelsEnabled)
        );
    }

    #[test]
    fn test_from_named() {
        let named = BTreeMap::from([
            ("mistral_reward_model".to_string(), 0.7),
            ("task_validator_filter".to_string(), 0.3),
        ]);
        let config = RewardFrameworkConfig::from_named(&named).unwrap();
        assert_eq!(config.weight(RewardModelType::Mistral), 0.7);

        let unknown = BTreeMap::from([("gpt_judge".to_string(), 1.0)]);
        assert_eq!(
            RewardFrameworkConfig::from_named(&unknown),
            Err(ConfigError::UnknownModel("gpt_judge".to_string()))
        );
    }
}
