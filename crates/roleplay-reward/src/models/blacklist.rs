use async_trait::async_trait;

use crate::{RewardContext, RewardError, RewardEvent, RewardModel, RewardModelType};

/// Phrases that mean the completion broke character
const DEFAULT_PHRASES: &[&str] = &[
    "as an ai",
    "as a language model",
    "i am an ai",
    "i'm an ai",
    "i cannot roleplay",
    "openai",
];

/// Rule-based filter: 0 when the completion contains a blacklisted phrase
/// (case-insensitive), 1 otherwise. Empty completions also score 0.
#[derive(Debug, Clone)]
pub struct BlacklistRewardModel {
    phrases: Vec<String>,
}

impl BlacklistRewardModel {
    pub fn new() -> Self {
        Self::with_phrases(DEFAULT_PHRASES.iter().map(|p| p.to_string()))
    }

    pub fn with_phrases(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl Default for BlacklistRewardModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewardModel for BlacklistRewardModel {
    fn model_type(&self) -> RewardModelType {
        RewardModelType::Blacklist
    }

    async fn reward(
        &self,
        _prompt: &str,
        completion: &str,
        _context: &RewardContext,
    ) -> Result<RewardEvent, RewardError> {
        let text = completion.to_lowercase();
        let hits = self.phrases.iter().filter(|p| text.contains(p.as_str())).count();
        let reward = if hits == 0 && !text.trim().is_empty() {
            1.0
        } else {
            0.0
        };
        Ok(RewardEvent::new(self.model_type(), reward).with_sub_score("hits", hits as f64))
    }
}
