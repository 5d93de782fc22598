use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{RewardContext, RewardError, RewardEvent, RewardModel, RewardModelType};

/// An opaque pretrained scoring model.
///
/// Returns the model's native output for one (prompt, completion) pair;
/// normalization into a reward happens in [`ScorerRewardModel`].
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, prompt: &str, completion: &str) -> Result<f64, RewardError>;
}

/// How a scorer's native output maps into `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Already a probability-like score; clamped
    #[default]
    Identity,
    /// Unbounded logit; passed through the logistic function
    Sigmoid,
    /// A penalty in `[0, 1]` where lower is better; inverted
    InvertPenalty,
}

impl Normalization {
    pub fn apply(self, raw: f64) -> Result<f64, RewardError> {
        if !raw.is_finite() {
            return Err(RewardError::InvalidScore(raw));
        }
        let reward = match self {
            Normalization::Identity => raw,
            Normalization::Sigmoid => 1.0 / (1.0 + (-raw).exp()),
            Normalization::InvertPenalty => 1.0 - raw.clamp(0.0, 1.0),
        };
        Ok(reward.clamp(0.0, 1.0))
    }
}

/// Reward model backed by a [`Scorer`]
pub struct ScorerRewardModel<S> {
    model_type: RewardModelType,
    scorer: S,
    normalization: Normalization,
    task_types: Option<Vec<String>>,
}

impl<S: Scorer> ScorerRewardModel<S> {
    pub fn new(model_type: RewardModelType, scorer: S, normalization: Normalization) -> Self {
        Self {
            model_type,
            scorer,
            normalization,
            task_types: None,
        }
    }

    /// Restrict the model to the given task types
    pub fn only_for(mut self, task_types: impl IntoIterator<Item = String>) -> Self {
        self.task_types = Some(task_types.into_iter().collect());
        self
    }
}

#[async_trait]
impl<S: Scorer> RewardModel for ScorerRewardModel<S> {
    fn model_type(&self) -> RewardModelType {
        self.model_type
    }

    fn applies_to(&self, task_type: &str) -> bool {
        self.task_types
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t == task_type))
    }

    async fn reward(
        &self,
        prompt: &str,
        completion: &str,
        _context: &RewardContext,
    ) -> Result<RewardEvent, RewardError> {
        let raw = self.scorer.score(prompt, completion).await?;
        let reward = self.normalization.apply(raw)?;
        Ok(RewardEvent::checked(self.model_type, reward)?.with_sub_score("raw", raw))
    }
}

/// Scorer served over HTTP.
///
/// POSTs `{"prompt": ..., "completion": ...}` and expects a JSON object with
/// a numeric `score` field.
#[derive(Debug, Clone)]
pub struct HttpScorer {
    client: Client,
    endpoint: String,
}

impl HttpScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RewardError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(RewardError::Configuration(
                "scorer endpoint must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RewardError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn parse_score(body: &Value) -> Result<f64, RewardError> {
        body.get("score").and_then(Value::as_f64).ok_or_else(|| {
            RewardError::MalformedResponse(format!("expected a numeric `score` field, got {body}"))
        })
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, prompt: &str, completion: &str) -> Result<f64, RewardError> {
        debug!(
            endpoint = %self.endpoint,
            completion_len = completion.len(),
            "Requesting score"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt, "completion": completion }))
            .send()
            .await
            .map_err(|e| RewardError::Backend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RewardError::Backend(format!("scorer error {status}: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RewardError::MalformedResponse(format!("invalid JSON: {e}")))?;

        Self::parse_score(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(f64);

    #[async_trait]
    impl Scorer for FixedScorer {
        async fn score(&self, _prompt: &str, _completion: &str) -> Result<f64, RewardError> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl Scorer for FailingScorer {
        async fn score(&self, _prompt: &str, completion: &str) -> Result<f64, RewardError> {
            if completion.contains("boom") {
                Err(RewardError::Backend("connection reset".into()))
            } else {
                Ok(0.9)
            }
        }
    }

    #[test]
    fn test_normalization() {
        assert_eq!(Normalization::Identity.apply(0.4).unwrap(), 0.4);
        assert_eq!(Normalization::Identity.apply(3.0).unwrap(), 1.0);
        assert_eq!(Normalization::Sigmoid.apply(0.0).unwrap(), 0.5);
        assert!(Normalization::Sigmoid.apply(6.0).unwrap() > 0.99);
        assert!((Normalization::InvertPenalty.apply(0.25).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(Normalization::InvertPenalty.apply(-2.0).unwrap(), 1.0);
    }

    #[test]
    fn test_non_finite_scores_are_rejected() {
        assert!(matches!(
            Normalization::Sigmoid.apply(f64::INFINITY),
            Err(RewardError::InvalidScore(_))
        ));
        assert!(matches!(
            Normalization::Identity.apply(f64::NAN),
            Err(RewardError::InvalidScore(_))
        ));
    }

    #[tokio::test]
    async fn test_scorer_model_normalizes_and_keeps_raw() {
        let model = ScorerRewardModel::new(
            RewardModelType::Mistral,
            FixedScorer(0.0),
            Normalization::Sigmoid,
        );
        let event = model
            .reward("p", "c", &RewardContext::default())
            .await
            .unwrap();
        assert_eq!(event.reward(), 0.5);
        assert_eq!(event.sub_scores().get("raw"), Some(&0.0));
        assert_eq!(model.name(), "mistral_reward_model");
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_completion() {
        let model =
            ScorerRewardModel::new(RewardModelType::Rlhf, FailingScorer, Normalization::Identity);
        let completions = vec!["fine".to_string(), "boom".to_string(), "also fine".to_string()];
        let events = model
            .get_rewards("p", &completions, &RewardContext::default())
            .await;
        assert_eq!(events.len(), 3);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(RewardError::Backend(_))));
        assert_eq!(events[2].as_ref().unwrap().reward(), 0.9);
    }

    #[test]
    fn test_applicability_filter() {
        let model = ScorerRewardModel::new(
            RewardModelType::Nsfw,
            FixedScorer(1.0),
            Normalization::Identity,
        )
        .only_for(vec!["dialogue-from-scenario".to_string()]);
        assert!(model.applies_to("dialogue-from-scenario"));
        assert!(!model.applies_to("message-from-description"));
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(HttpScorer::parse_score(&json!({"score": 0.42})).unwrap(), 0.42);
        assert!(matches!(
            HttpScorer::parse_score(&json!({"label": "positive"})),
            Err(RewardError::MalformedResponse(_))
        ));
        assert!(matches!(
            HttpScorer::parse_score(&json!({"score": "high"})),
            Err(RewardError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        assert!(matches!(
            HttpScorer::new("  ", Duration::from_secs(1)),
            Err(RewardError::Configuration(_))
        ));
    }
}
