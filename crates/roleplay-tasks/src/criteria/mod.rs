//! Criteria a completion is scored against.
//!
//! Each criterion scores a completion on its own and reports a penalty in
//! `[0, penalty]`, where `0` means fully compliant.

mod content;
mod layout;
mod length;

use std::fmt::Debug;
use std::sync::Arc;

pub use content::{ContentMatchType, MatchContentCriterion};
pub use layout::{LayoutMatchType, MatchLayoutCriterion, SimpleResponseLayoutCriterion};
pub use length::{MatchLengthCriterion, TextLengthUnit};

/// A single measurable constraint on a completion
pub trait TaskCriterion: Debug + Send + Sync {
    /// Short kind tag (e.g. "length-match")
    fn kind(&self) -> &'static str;

    /// Maximum penalty this criterion can assign
    fn penalty(&self) -> f64;

    /// Constraint statement suitable for a prompt bullet point
    fn compose_text(&self) -> String;

    /// Penalty in `[0, penalty()]` for the given completion
    fn score(&self, completion: &str) -> f64;
}

/// Shared handle to a criterion, so tasks stay cheap to clone
pub type Criterion = Arc<dyn TaskCriterion>;

/// Quote and join keywords for prompt text: `"a"`, `"a" and "b"`,
/// `"a", "b" and "c"`.
pub(crate) fn join_quoted(words: &[String]) -> String {
    let quoted: Vec<String> = words.iter().map(|w| format!("\"{}\"", w)).collect();
    match quoted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}
