mod context;
mod error;
mod outcome;
mod round_runner;

pub use context::{CompletionRecord, RoundRecord, RunContext, DEFAULT_HISTORY_LIMIT};
pub use error::RoundError;
pub use outcome::RunOutcome;
pub use round_runner::RoundRunner;
