//! # roleplay-reward
//!
//! Scoring of completions by several independent reward models, and the
//! weighted combination of their scores into one reward per completion.
//!
//! ## Key Types
//!
//! - [`RewardModel`] - One scoring mechanism, model-based or rule-based
//! - [`RewardEvent`] - A single normalized reward with metadata
//! - [`RewardFrameworkConfig`] - Validated per-model weights
//! - [`RewardFramework`] - Runs every applicable model and aggregates

mod aggregator;
mod config;
mod event;
mod framework;
mod model;
pub mod models;

pub use aggregator::{aggregate, aggregate_batch, select_best, AggregatedReward};
pub use config::{ConfigError, RewardFrameworkConfig, RewardModelType, WEIGHT_TOLERANCE};
pub use event::{RewardError, RewardEvent};
pub use framework::{ModelOutputs, RewardFramework};
pub use model::{RewardContext, RewardModel};
