use std::sync::Arc;

use async_trait::async_trait;
use roleplay_characters::Character;
use roleplay_reward::models::TaskValidatorRewardModel;
use roleplay_reward::{
    RewardContext, RewardError, RewardEvent, RewardFramework, RewardFrameworkConfig, RewardModel,
    RewardModelType,
};
use roleplay_tasks::{MatchLengthCriterion, Task, TaskFamily, TextLengthUnit};

/// Helper: a model returning the same reward for every completion.
struct ConstantModel {
    model_type: RewardModelType,
    reward: f64,
    task_types: Option<&'static str>,
}

#[async_trait]
impl RewardModel for ConstantModel {
    fn model_type(&self) -> RewardModelType {
        self.model_type
    }

    fn applies_to(&self, task_type: &str) -> bool {
        self.task_types.map_or(true, |t| t == task_type)
    }

    async fn reward(
        &self,
        _prompt: &str,
        _completion: &str,
        _context: &RewardContext,
    ) -> Result<RewardEvent, RewardError> {
        Ok(RewardEvent::new(self.model_type, self.reward))
    }
}

/// Helper: a model that panics, to exercise task isolation.
struct PanickingModel;

#[async_trait]
impl RewardModel for PanickingModel {
    fn model_type(&self) -> RewardModelType {
        RewardModelType::Dpo
    }

    async fn reward(
        &self,
        _prompt: &str,
        _completion: &str,
        _context: &RewardContext,
    ) -> Result<RewardEvent, RewardError> {
        panic!("model crashed")
    }
}

fn ava_task() -> Task {
    let character = Character::new("Ava", "A curious robot.");
    Task::new(
        TaskFamily::MessageFromDescription,
        character.description.clone(),
        character,
        vec![Arc::new(MatchLengthCriterion::new(
            0.25,
            100,
            TextLengthUnit::Words,
        ))],
    )
}

fn hundred_words() -> String {
    vec!["beep"; 100].join(" ")
}

fn constant(model_type: RewardModelType, reward: f64) -> Arc<dyn RewardModel> {
    Arc::new(ConstantModel {
        model_type,
        reward,
        task_types: None,
    })
}

#[test]
fn test_ava_prompt_layout() {
    let task = ava_task();
    let prompt = task.compose_prompt();

    let instruction_at = prompt.find(task.compose_instruction()).unwrap();
    let base_at = prompt.find("A curious robot.").unwrap();
    let criterion_at = prompt
        .find("- The response must be 100 words long.")
        .unwrap();
    assert!(instruction_at < base_at);
    assert!(base_at < criterion_at);
    assert_eq!(prompt, task.compose_prompt());
    assert_eq!(task.criteria()[0].score(&hundred_words()), 0.0);
}

#[tokio::test]
async fn test_two_models_weighted() {
    let config =
        RewardFrameworkConfig::new([(RewardModelType::Rlhf, 0.6), (RewardModelType::Dpo, 0.4)])
            .unwrap();
    let framework = RewardFramework::new(config)
        .with_model(constant(RewardModelType::Rlhf, 0.8))
        .with_model(constant(RewardModelType::Dpo, 0.5));

    let task = ava_task();
    let rewards = framework
        .evaluate(
            &task.compose_prompt(),
            &[hundred_words()],
            &RewardContext::for_task(&task),
        )
        .await;

    assert_eq!(rewards.len(), 1);
    assert!((rewards[0].reward - 0.68).abs() < 1e-12);
}

#[tokio::test]
async fn test_inapplicable_model_is_renormalized_away() {
    let config =
        RewardFrameworkConfig::new([(RewardModelType::Rlhf, 0.6), (RewardModelType::Nsfw, 0.4)])
            .unwrap();
    let framework = RewardFramework::new(config)
        .with_model(constant(RewardModelType::Rlhf, 0.8))
        .with_model(Arc::new(ConstantModel {
            model_type: RewardModelType::Nsfw,
            reward: 0.1,
            task_types: Some("dialogue-from-scenario"),
        }));

    let task = ava_task();
    let rewards = framework
        .evaluate("prompt", &["hi".to_string()], &RewardContext::for_task(&task))
        .await;

    assert!((rewards[0].reward - 0.8).abs() < 1e-12);
    assert!(!rewards[0].per_model.contains_key(&RewardModelType::Nsfw));
}

#[tokio::test]
async fn test_task_validator_end_to_end() {
    let config = RewardFrameworkConfig::new([(RewardModelType::TaskValidator, 1.0)]).unwrap();
    let framework =
        RewardFramework::new(config).with_model(Arc::new(TaskValidatorRewardModel::new()));

    let task = ava_task();
    let completions = vec![hundred_words(), "too short".to_string()];
    let rewards = framework
        .evaluate(
            &task.compose_prompt(),
            &completions,
            &RewardContext::for_task(&task),
        )
        .await;

    assert_eq!(rewards[0].reward, 1.0);
    assert!(rewards[1].reward < 1.0);
    assert!(rewards[1].reward >= 0.75);
}

#[tokio::test]
async fn test_panicking_model_does_not_abort_the_round() {
    let config =
        RewardFrameworkConfig::new([(RewardModelType::Rlhf, 0.5), (RewardModelType::Dpo, 0.5)])
            .unwrap();
    let framework = RewardFramework::new(config)
        .with_model(constant(RewardModelType::Rlhf, 1.0))
        .with_model(Arc::new(PanickingModel));

    let completions = vec!["a".to_string(), "b".to_string()];
    let rewards = framework
        .evaluate("prompt", &completions, &RewardContext::named("augment"))
        .await;

    assert_eq!(rewards.len(), 2);
    for reward in &rewards {
        assert!((reward.reward - 0.5).abs() < 1e-12);
        assert_eq!(reward.failures, vec![RewardModelType::Dpo]);
    }
}

#[tokio::test]
async fn test_zero_weight_models_are_not_run() {
    let config = RewardFrameworkConfig::default();
    let framework = RewardFramework::new(config)
        .with_model(constant(RewardModelType::Rlhf, 0.9))
        .with_model(constant(RewardModelType::Dahoas, 0.0));

    assert_eq!(framework.applicable_models("augment").len(), 1);
}
