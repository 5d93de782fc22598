use async_trait::async_trait;
use roleplay_tasks::{Criterion, Task};

use crate::{RewardError, RewardEvent, RewardModelType};

/// What a reward model may know about the request being scored
#[derive(Debug, Clone, Default)]
pub struct RewardContext {
    /// Name of the request (the task name)
    pub name: String,
    /// Task type tag, used to decide model applicability
    pub task_type: String,
    /// Criteria the completion is expected to respect
    pub criteria: Vec<Criterion>,
}

impl RewardContext {
    pub fn for_task(task: &Task) -> Self {
        Self {
            name: task.task_name().to_string(),
            task_type: task.task_type().to_string(),
            criteria: task.criteria().to_vec(),
        }
    }

    /// Context with a name only, for models that need nothing else
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One scoring mechanism.
///
/// Implementations only need [`RewardModel::reward`]; the default
/// [`RewardModel::get_rewards`] scores completions one by one so that a
/// failure stays confined to its own entry.
#[async_trait]
pub trait RewardModel: Send + Sync {
    /// Identity used for weighting
    fn model_type(&self) -> RewardModelType;

    /// Human-readable name of the model
    fn name(&self) -> &str {
        self.model_type().as_str()
    }

    /// Whether this model should score the given task type at all
    fn applies_to(&self, _task_type: &str) -> bool {
        true
    }

    /// Score one completion. The returned reward is in `[0, 1]`.
    async fn reward(
        &self,
        prompt: &str,
        completion: &str,
        context: &RewardContext,
    ) -> Result<RewardEvent, RewardError>;

    /// Score every completion. The output has one entry per completion, in
    /// input order.
    async fn get_rewards(
        &self,
        prompt: &str,
        completions: &[String],
        context: &RewardContext,
    ) -> Vec<Result<RewardEvent, RewardError>> {
        let mut events = Vec::with_capacity(completions.len());
        for completion in completions {
            events.push(self.reward(prompt, completion, context).await);
        }
        events
    }
}
