use serde::Serialize;
use std::time::Duration;

use crate::RoundRecord;

/// The final outcome of a validation run
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every requested round finished
    Completed {
        rounds: usize,
        history: Vec<RoundRecord>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    UserInterrupted {
        rounds: usize,
        history: Vec<RoundRecord>,
        total_duration_secs: f64,
    },
    /// Unrecoverable error
    Failed {
        rounds: usize,
        error: String,
        history: Vec<RoundRecord>,
        total_duration_secs: f64,
    },
}

impl RunOutcome {
    pub fn completed(rounds: usize, history: Vec<RoundRecord>, duration: Duration) -> Self {
        Self::Completed {
            rounds,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(rounds: usize, history: Vec<RoundRecord>, duration: Duration) -> Self {
        Self::UserInterrupted {
            rounds,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        rounds: usize,
        error: String,
        history: Vec<RoundRecord>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            rounds,
            error,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn rounds(&self) -> usize {
        match self {
            Self::Completed { rounds, .. } => *rounds,
            Self::UserInterrupted { rounds, .. } => *rounds,
            Self::Failed { rounds, .. } => *rounds,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::Completed {
                total_duration_secs,
                ..
            } => *total_duration_secs,
            Self::UserInterrupted {
                total_duration_secs,
                ..
            } => *total_duration_secs,
            Self::Failed {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    pub fn history(&self) -> &[RoundRecord] {
        match self {
            Self::Completed { history, .. } => history,
            Self::UserInterrupted { history, .. } => history,
            Self::Failed { history, .. } => history,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::UserInterrupted { .. } => 130,
            Self::Failed { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let d = Duration::from_secs(1);
        assert_eq!(RunOutcome::completed(3, vec![], d).exit_code(), 0);
        assert_eq!(RunOutcome::interrupted(1, vec![], d).exit_code(), 130);
        assert_eq!(RunOutcome::failed(0, "boom".into(), vec![], d).exit_code(), 2);
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let outcome = RunOutcome::failed(1, "starved".into(), vec![], Duration::from_secs(2));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "starved");
        assert_eq!(json["total_duration_secs"], 2.0);
    }
}
