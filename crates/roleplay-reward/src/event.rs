use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::RewardModelType;

/// Failure to score one completion with one model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewardError {
    #[error("Scoring backend failed: {0}")]
    Backend(String),

    #[error("Malformed scorer response: {0}")]
    MalformedResponse(String),

    #[error("Scorer returned a non-finite score: {0}")]
    InvalidScore(f64),

    #[error("Reward model configuration error: {0}")]
    Configuration(String),

    #[error("Reward model returned no result for completion {index}")]
    MissingResult { index: usize },

    #[error("Reward model task aborted: {0}")]
    Aborted(String),
}

/// A normalized reward for one (prompt, completion) pair from one model.
///
/// `reward` is in `[0, 1]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardEvent {
    model: RewardModelType,
    reward: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    sub_scores: BTreeMap<String, f64>,
}

impl RewardEvent {
    /// Create an event; the reward is clamped into `[0, 1]` and a
    /// non-finite reward becomes 0.
    pub fn new(model: RewardModelType, reward: f64) -> Self {
        let reward = if reward.is_finite() {
            reward.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            model,
            reward,
            sub_scores: BTreeMap::new(),
        }
    }

    /// Like [`RewardEvent::new`], but a non-finite reward is an error so the
    /// aggregator records the model as failed.
    pub fn checked(model: RewardModelType, reward: f64) -> Result<Self, RewardError> {
        if !reward.is_finite() {
            return Err(RewardError::InvalidScore(reward));
        }
        Ok(Self::new(model, reward))
    }

    /// Attach a raw sub-score (e.g. the unnormalized model output)
    pub fn with_sub_score(mut self, name: impl Into<String>, value: f64) -> Self {
        self.sub_scores.insert(name.into(), value);
        self
    }

    pub fn model(&self) -> RewardModelType {
        self.model
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn sub_scores(&self) -> &BTreeMap<String, f64> {
        &self.sub_scores
    }
}
