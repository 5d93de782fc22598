//! # roleplay-characters
//!
//! Character records used to seed roleplay tasks.
//!
//! ## Key Types
//!
//! - [`Character`] - Fixed-shape persona record
//! - [`CharacterDataset`] - Reopenable source of raw records
//! - [`CharacterSource`] - Infinite, filtering, reshuffling cursor over a dataset

mod character;
mod dataset;
mod source;

pub use character::Character;
pub use dataset::{CharacterDataset, DatasetError, JsonlDataset, RecordStream, Shuffled, VecDataset};
pub use source::{CharacterSource, SourceError, SEED_RANGE, SHUFFLE_BUFFER_SIZE};
