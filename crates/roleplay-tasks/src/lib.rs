//! # roleplay-tasks
//!
//! Composition of roleplay prompts from a character, a base text and a set
//! of independently scored criteria.
//!
//! ## Key Types
//!
//! - [`Task`] - Immutable prompt-generation unit
//! - [`TaskFamily`] - The kinds of task that can be built
//! - [`TaskCriterion`] - A single scorable constraint on a completion

pub mod criteria;
mod factory;
mod task;

pub use criteria::{
    ContentMatchType, Criterion, LayoutMatchType, MatchContentCriterion, MatchLayoutCriterion,
    MatchLengthCriterion, SimpleResponseLayoutCriterion, TaskCriterion, TextLengthUnit,
};
pub use factory::{create_dialogue_from_scenario_task, create_message_from_description_task};
pub use task::{Task, TaskFamily, CRITERIA_HEADER};
