use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use roleplay_agent::{CompletionProvider, CompletionRequest, ProviderConfig};
use roleplay_characters::CharacterSource;
use roleplay_logging::{LogEvent, Logger};
use roleplay_reward::{select_best, AggregatedReward, RewardContext, RewardFramework};
use roleplay_tasks::{Task, TaskFamily};

use crate::context::{CompletionRecord, RoundRecord};
use crate::error::RoundError;
use crate::outcome::RunOutcome;
use crate::RunContext;

/// What a provider produced for one round, before scoring
struct ProviderResult {
    provider: String,
    text: String,
    error: Option<String>,
    duration: Duration,
}

/// Orchestrates validation rounds: pull a character, compose a task, query
/// every provider, score the completions and pick the best one.
pub struct RoundRunner {
    source: CharacterSource,
    providers: Vec<Arc<dyn CompletionProvider>>,
    framework: RewardFramework,
    provider_config: ProviderConfig,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
    rng: StdRng,
}

impl RoundRunner {
    pub fn new(source: CharacterSource, framework: RewardFramework, logger: Arc<Logger>) -> Self {
        Self {
            source,
            providers: Vec::new(),
            framework,
            provider_config: ProviderConfig::default(),
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_provider_config(mut self, config: ProviderConfig) -> Self {
        self.provider_config = config;
        self
    }

    /// Use a fixed seed for task sampling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn framework(&self) -> &RewardFramework {
        &self.framework
    }

    /// Pull the next character and build a randomly chosen task for it
    pub fn compose_task(&mut self) -> Result<Task, RoundError> {
        let character = self.source.next_character()?;
        let family = TaskFamily::sample(&mut self.rng);
        debug!(character = %character.name, family = %family, "Composing task");
        Ok(family.build(character, &mut self.rng))
    }

    /// Run rounds until the limit is reached, an error occurs or the
    /// interrupt flag is raised. Interruption is checked between rounds.
    pub async fn run(&mut self, mut context: RunContext) -> RunOutcome {
        info!(run_id = %context.run_id, providers = self.providers.len(), "Starting run");

        let outcome = loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Run interrupted by user");
                let duration = context.total_duration();
                break RunOutcome::interrupted(context.round, context.history.into(), duration);
            }

            if !context.should_continue() {
                let duration = context.total_duration();
                break RunOutcome::completed(context.round, context.history.into(), duration);
            }

            match self.run_round(&context).await {
                Ok(record) => {
                    context.push_record(record);
                    context.increment_round();
                }
                Err(e) => {
                    warn!(error = %e, "Error during round");
                    self.logger.log(&LogEvent::ErrorEncountered {
                        round: context.round,
                        error: e.to_string(),
                    });
                    let duration = context.total_duration();
                    break RunOutcome::failed(
                        context.round,
                        e.to_string(),
                        context.history.into(),
                        duration,
                    );
                }
            }
        };

        self.logger.log(&LogEvent::RunCompleted {
            rounds: outcome.rounds(),
            interrupted: matches!(outcome, RunOutcome::UserInterrupted { .. }),
            duration_secs: outcome.total_duration_secs(),
        });
        outcome
    }

    /// Run a single round and return its record
    pub async fn run_round(&mut self, context: &RunContext) -> Result<RoundRecord, RoundError> {
        if self.providers.is_empty() {
            return Err(RoundError::NoProviders);
        }
        let started = Instant::now();
        let round = context.round;

        let task = self.compose_task()?;
        self.logger.log(&LogEvent::RoundStarted {
            round,
            character: task.character().name.clone(),
        });

        let prompt = task.compose_prompt();
        self.logger.log(&LogEvent::TaskComposed {
            round,
            task_type: task.task_type().to_string(),
            task_name: task.task_name().to_string(),
            criteria: task.criteria().len(),
            prompt_chars: prompt.chars().count(),
        });

        let request = CompletionRequest::new(prompt.clone())
            .with_stop(task.stop_sequences())
            .with_speaker(task.character().display_name());
        let results = self.query_providers(round, request).await;

        let completions: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
        let rewards = self
            .framework
            .evaluate(&prompt, &completions, &RewardContext::for_task(&task))
            .await;
        self.log_model_scores(round, &rewards);

        let best_index = select_best(&rewards);
        let completions: Vec<CompletionRecord> = results
            .into_iter()
            .zip(rewards)
            .map(|(result, reward)| CompletionRecord {
                provider: result.provider,
                text: result.text,
                error: result.error,
                duration_secs: result.duration.as_secs_f64(),
                reward,
            })
            .collect();

        let record = RoundRecord {
            run_id: context.run_id,
            round,
            character: task.character().name.clone(),
            task_type: task.task_type().to_string(),
            task_name: task.task_name().to_string(),
            prompt,
            criteria: task.get_criteria_strs(),
            completions,
            best_index,
            duration_secs: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        };

        self.logger.log(&LogEvent::RoundCompleted {
            round,
            best_provider: record.best().map(|c| c.provider.clone()),
            best_reward: record.best_reward(),
            duration_secs: record.duration_secs,
        });
        info!(
            round = round + 1,
            best = ?record.best_index,
            reward = record.best_reward(),
            "Round completed"
        );

        Ok(record)
    }

    /// Query every provider concurrently. A failed provider contributes an
    /// empty completion so that it is still scored, in provider order.
    async fn query_providers(&self, round: usize, request: CompletionRequest) -> Vec<ProviderResult> {
        let request = Arc::new(request);
        let handles: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = provider.clone();
                let request = request.clone();
                let config = self.provider_config.clone();
                let name = provider.name().to_string();
                let handle = tokio::spawn(async move {
                    let started = Instant::now();
                    let result = provider.complete(&request, &config).await;
                    (result, started.elapsed())
                });
                (name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (provider, handle) in handles {
            let result = match handle.await {
                Ok((Ok(output), _)) => {
                    self.logger.log(&LogEvent::CompletionReceived {
                        round,
                        provider: provider.clone(),
                        words: output.word_count(),
                        duration_secs: output.duration.as_secs_f64(),
                    });
                    ProviderResult {
                        provider,
                        text: output.text,
                        error: None,
                        duration: output.duration,
                    }
                }
                Ok((Err(e), elapsed)) => self.provider_failed(round, provider, e.to_string(), elapsed),
                Err(e) => self.provider_failed(round, provider, e.to_string(), Duration::ZERO),
            };
            results.push(result);
        }
        results
    }

    fn provider_failed(
        &self,
        round: usize,
        provider: String,
        error: String,
        duration: Duration,
    ) -> ProviderResult {
        warn!(provider = %provider, error = %error, "Provider failed, scoring empty completion");
        self.logger.log(&LogEvent::ProviderFailed {
            round,
            provider: provider.clone(),
            error: error.clone(),
        });
        ProviderResult {
            provider,
            text: String::new(),
            error: Some(error),
            duration,
        }
    }

    fn log_model_scores(&self, round: usize, rewards: &[AggregatedReward]) {
        for (model, _) in self.framework.config().enabled() {
            let scores: Vec<f64> = rewards
                .iter()
                .filter_map(|r| r.per_model.get(&model).copied())
                .collect();
            if scores.is_empty() {
                continue;
            }
            self.logger.log(&LogEvent::ModelScored {
                round,
                model: model.to_string(),
                mean_reward: scores.iter().sum::<f64>() / scores.len() as f64,
            });
        }
        for (completion, reward) in rewards.iter().enumerate() {
            for model in &reward.failures {
                self.logger.log(&LogEvent::ScoringFailed {
                    round,
                    model: model.to_string(),
                    completion,
                });
            }
        }
    }
}
