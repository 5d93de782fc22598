use async_trait::async_trait;

use crate::{RewardContext, RewardError, RewardEvent, RewardModel, RewardModelType};

/// Rule-based model scoring a completion against the task's own criteria.
///
/// The reward is `1 - Σ penalties`, clamped to `[0, 1]`; a non-finite
/// penalty fails the completion. Each criterion's
/// penalty is recorded as a sub-score keyed `"{index}:{kind}"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskValidatorRewardModel;

impl TaskValidatorRewardModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RewardModel for TaskValidatorRewardModel {
    fn model_type(&self) -> RewardModelType {
        RewardModelType::TaskValidator
    }

    async fn reward(
        &self,
        _prompt: &str,
        completion: &str,
        context: &RewardContext,
    ) -> Result<RewardEvent, RewardError> {
        let penalties: Vec<(String, f64)> = context
            .criteria
            .iter()
            .enumerate()
            .map(|(idx, criterion)| {
                (
                    format!("{}:{}", idx, criterion.kind()),
                    criterion.score(completion),
                )
            })
            .collect();

        let total: f64 = penalties.iter().map(|(_, p)| p).sum();

        let event = penalties.into_iter().fold(
            RewardEvent::checked(self.model_type(), 1.0 - total)?,
            |event, (key, penalty)| event.with_sub_score(key, penalty),
        );
        Ok(event)
    }
}
