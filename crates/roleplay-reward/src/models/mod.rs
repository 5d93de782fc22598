//! Concrete reward models.

mod blacklist;
mod scorer;
mod task_validator;

pub use blacklist::BlacklistRewardModel;
pub use scorer::{HttpScorer, Normalization, Scorer, ScorerRewardModel};
pub use task_validator::TaskValidatorRewardModel;
