use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    aggregate_batch, AggregatedReward, RewardContext, RewardError, RewardEvent, RewardFrameworkConfig,
    RewardModel, RewardModelType,
};

/// Each model's raw per-completion results
pub type ModelOutputs = Vec<(RewardModelType, Vec<Result<RewardEvent, RewardError>>)>;

/// The registered reward models plus their validated weights
pub struct RewardFramework {
    models: Vec<Arc<dyn RewardModel>>,
    config: RewardFrameworkConfig,
}

impl RewardFramework {
    pub fn new(config: RewardFrameworkConfig) -> Self {
        Self {
            models: Vec::new(),
            config,
        }
    }

    /// Register a model. Models whose type has no weight are kept but
    /// never run.
    pub fn with_model(mut self, model: Arc<dyn RewardModel>) -> Self {
        if !self.config.is_enabled(model.model_type()) {
            warn!(model = model.name(), "Registered reward model has zero weight");
        }
        self.models.push(model);
        self
    }

    pub fn config(&self) -> &RewardFrameworkConfig {
        &self.config
    }

    pub fn models(&self) -> &[Arc<dyn RewardModel>] {
        &self.models
    }

    /// Enabled models that apply to `task_type`
    pub fn applicable_models(&self, task_type: &str) -> Vec<Arc<dyn RewardModel>> {
        self.models
            .iter()
            .filter(|m| self.config.is_enabled(m.model_type()) && m.applies_to(task_type))
            .cloned()
            .collect()
    }

    /// Run every applicable model concurrently and wait for all of them.
    ///
    /// A model whose task aborts yields an error entry for every completion.
    pub async fn score(
        &self,
        prompt: &str,
        completions: &[String],
        context: &RewardContext,
    ) -> ModelOutputs {
        let models = self.applicable_models(&context.task_type);
        debug!(
            models = models.len(),
            completions = completions.len(),
            task_type = %context.task_type,
            "Scoring completions"
        );

        let prompt: Arc<str> = Arc::from(prompt);
        let completions_shared = Arc::new(completions.to_vec());
        let context = Arc::new(context.clone());

        let handles: Vec<_> = models
            .into_iter()
            .map(|model| {
                let model_type = model.model_type();
                let prompt = prompt.clone();
                let completions = completions_shared.clone();
                let context = context.clone();
                let handle = tokio::spawn(async move {
                    model.get_rewards(&prompt, &completions, &context).await
                });
                (model_type, handle)
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for (model_type, handle) in handles {
            let results = match handle.await {
                Ok(results) => results,
                Err(e) => {
                    warn!(model = %model_type, error = %e, "Reward model task aborted");
                    (0..completions.len())
                        .map(|_| Err(RewardError::Aborted(e.to_string())))
                        .collect()
                }
            };
            outputs.push((model_type, results));
        }
        outputs
    }

    /// Score and aggregate: one final reward per completion, in input order
    pub async fn evaluate(
        &self,
        prompt: &str,
        completions: &[String],
        context: &RewardContext,
    ) -> Vec<AggregatedReward> {
        let outputs = self.score(prompt, completions, context).await;
        let rewards = aggregate_batch(completions.len(), &outputs, self.config.weights());
        info!(
            name = %context.name,
            completions = completions.len(),
            models = outputs.len(),
            "Completions scored"
        );
        rewards
    }
}
