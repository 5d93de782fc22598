use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::{RewardError, RewardEvent, RewardModelType};

/// Weighted mean of the rewards of the models present in both maps.
///
/// Models missing from `events` (e.g. not applicable to the task type) are
/// left out of both the sum and the normalizing weight, so the remaining
/// weights are rescaled to 1. If no positive weight applies, the result is
/// 0.
pub fn aggregate(
    events: &BTreeMap<RewardModelType, RewardEvent>,
    weights: &BTreeMap<RewardModelType, f64>,
) -> f64 {
    let (weighted, used) = events
        .iter()
        .filter_map(|(model, event)| weights.get(model).map(|w| (*w, event.reward())))
        .filter(|(w, _)| w.is_finite() && *w > 0.0)
        .fold((0.0, 0.0), |(weighted, used), (w, reward)| {
            (weighted + w * reward, used + w)
        });

    if used > 0.0 {
        weighted / used
    } else {
        0.0
    }
}

/// Final reward of one completion with its per-model breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedReward {
    pub reward: f64,
    pub per_model: BTreeMap<RewardModelType, f64>,
    /// Models that failed to score this completion (counted as 0)
    pub failures: Vec<RewardModelType>,
}

/// Combine the output of several models into one reward per completion.
///
/// `outputs` holds each model's `get_rewards` result. A failed entry, or a
/// missing one when a model returned fewer results than completions, counts
/// as reward 0 for that model; its weight still applies.
pub fn aggregate_batch(
    completion_count: usize,
    outputs: &[(RewardModelType, Vec<Result<RewardEvent, RewardError>>)],
    weights: &BTreeMap<RewardModelType, f64>,
) -> Vec<AggregatedReward> {
    (0..completion_count)
        .map(|index| {
            let mut events = BTreeMap::new();
            let mut failures = Vec::new();

            for (model, results) in outputs {
                let event = match results.get(index) {
                    Some(Ok(event)) => event.clone(),
                    Some(Err(e)) => {
                        warn!(model = %model, index, error = %e, "Scoring failed, using reward 0");
                        failures.push(*model);
                        RewardEvent::new(*model, 0.0)
                    }
                    None => {
                        let e = RewardError::MissingResult { index };
                        warn!(model = %model, index, error = %e, "Scoring failed, using reward 0");
                        failures.push(*model);
                        RewardEvent::new(*model, 0.0)
                    }
                };
                events.insert(*model, event);
            }

            let per_model = events.iter().map(|(m, e)| (*m, e.reward())).collect();
            AggregatedReward {
                reward: aggregate(&events, weights),
                per_model,
                failures,
            }
        })
        .collect()
}

/// Index of the best completion; the first one wins ties.
///
/// A non-finite reward ranks below every real score. Returns `None` only
/// when there are no completions at all.
pub fn select_best(rewards: &[AggregatedReward]) -> Option<usize> {
    rewards
        .iter()
        .map(|r| {
            if r.reward.is_finite() {
                r.reward
            } else {
                f64::NEG_INFINITY
            }
        })
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (idx, reward)| match best {
            Some((_, top)) if top >= reward => best,
            _ => Some((idx, reward)),
        })
        .map(|(idx, _)| idx)
}
