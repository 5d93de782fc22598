use chrono::{DateTime, Utc};
use roleplay_reward::AggregatedReward;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Rounds kept in [`RunContext::history`] unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Shared state for a sequence of validation rounds
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier attached to every record of this run
    pub run_id: Uuid,
    /// Current round number (0-indexed)
    pub round: usize,
    /// Records of the most recent finished rounds, oldest first
    pub history: VecDeque<RoundRecord>,
    /// Upper bound on `history`; older records are dropped
    pub history_limit: usize,
    /// When the run started
    started_at: Instant,
    /// Maximum rounds (None = until interrupted)
    pub max_rounds: Option<usize>,
}

/// One provider's answer within a round
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRecord {
    pub provider: String,
    pub text: String,
    /// Set when the provider failed and an empty completion was scored instead
    pub error: Option<String>,
    pub duration_secs: f64,
    pub reward: AggregatedReward,
}

/// Record of a single round
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub run_id: Uuid,
    pub round: usize,
    pub character: String,
    pub task_type: String,
    pub task_name: String,
    pub prompt: String,
    pub criteria: Vec<String>,
    pub completions: Vec<CompletionRecord>,
    pub best_index: Option<usize>,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

impl RoundRecord {
    /// The winning completion, if any provider was queried
    pub fn best(&self) -> Option<&CompletionRecord> {
        self.best_index.and_then(|i| self.completions.get(i))
    }

    pub fn best_reward(&self) -> f64 {
        self.best().map_or(0.0, |c| c.reward.reward)
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            round: 0,
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            started_at: Instant::now(),
            max_rounds: None,
        }
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = Some(max);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.history.truncate(limit);
        self
    }

    pub fn increment_round(&mut self) {
        self.round += 1;
    }

    pub fn push_record(&mut self, record: RoundRecord) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn should_continue(&self) -> bool {
        match self.max_rounds {
            Some(max) => self.round < max,
            None => true,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_limit() {
        let mut context = RunContext::new().with_max_rounds(2);
        assert!(context.should_continue());
        context.increment_round();
        context.increment_round();
        assert!(!context.should_continue());
        assert!(RunContext::new().should_continue());
    }

    fn record(round: usize) -> RoundRecord {
        RoundRecord {
            run_id: Uuid::nil(),
            round,
            character: "Ava".into(),
            task_type: "message-from-description".into(),
            task_name: "augment".into(),
            prompt: String::new(),
            criteria: vec![],
            completions: vec![],
            best_index: None,
            duration_secs: 0.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_history_keeps_latest_rounds() {
        let mut context = RunContext::new().with_history_limit(3);
        for round in 0..10 {
            context.push_record(record(round));
        }
        let rounds: Vec<usize> = context.history.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![7, 8, 9]);

        let mut none_kept = RunContext::new().with_history_limit(0);
        none_kept.push_record(record(0));
        assert!(none_kept.history.is_empty());
        assert_eq!(RunContext::new().history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
