use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{TaskCriterion, TextLengthUnit};

lazy_static! {
    static ref BULLET_LINE: Regex = Regex::new(r"(?m)^\s*[-*•+]\s+\S").unwrap();
    static ref NUMBERED_LINE: Regex = Regex::new(r"(?m)^\s*\d+[.)]\s+\S").unwrap();
    static ref HEADING_LINE: Regex = Regex::new(r"(?m)^\s*#{1,6}\s+\S").unwrap();
    static ref QUOTED_SPEECH: Regex = Regex::new(r#""[^"\n]+"|“[^”\n]+”"#).unwrap();
}

/// Structural shape a completion should have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMatchType {
    SingleParagraph,
    DialogueWithNarration,
    UnorderedList,
    NumberedList,
}

impl LayoutMatchType {
    fn description(self) -> &'static str {
        match self {
            LayoutMatchType::SingleParagraph => "written as a single paragraph",
            LayoutMatchType::DialogueWithNarration => {
                "written as quoted dialogue mixed with narration"
            }
            LayoutMatchType::UnorderedList => "formatted as an unordered list",
            LayoutMatchType::NumberedList => "formatted as a numbered list",
        }
    }

    /// Whether `text` has this layout
    pub fn matches(self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        match self {
            LayoutMatchType::SingleParagraph => {
                TextLengthUnit::Paragraphs.count(text) == 1 && !has_list_lines(text)
            }
            LayoutMatchType::DialogueWithNarration => {
                let has_speech = QUOTED_SPEECH.is_match(text);
                let narration = QUOTED_SPEECH.replace_all(text, " ");
                has_speech && narration.chars().any(char::is_alphabetic)
            }
            LayoutMatchType::UnorderedList => BULLET_LINE.find_iter(text).count() >= 2,
            LayoutMatchType::NumberedList => NUMBERED_LINE.find_iter(text).count() >= 2,
        }
    }
}

fn has_list_lines(text: &str) -> bool {
    BULLET_LINE.is_match(text) || NUMBERED_LINE.is_match(text)
}

/// The completion must have the given layout; anything else gets the full
/// penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLayoutCriterion {
    penalty: f64,
    layout: LayoutMatchType,
}

impl MatchLayoutCriterion {
    pub fn new(penalty: f64, layout: LayoutMatchType) -> Self {
        Self { penalty, layout }
    }

    pub fn layout(&self) -> LayoutMatchType {
        self.layout
    }
}

impl TaskCriterion for MatchLayoutCriterion {
    fn kind(&self) -> &'static str {
        "layout-match"
    }

    fn penalty(&self) -> f64 {
        self.penalty
    }

    fn compose_text(&self) -> String {
        format!("The response must be {}.", self.layout.description())
    }

    fn score(&self, completion: &str) -> f64 {
        if self.layout.matches(completion) {
            0.0
        } else {
            self.penalty
        }
    }
}

/// Plain prose only: no list items and no markdown headings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleResponseLayoutCriterion {
    penalty: f64,
}

impl SimpleResponseLayoutCriterion {
    pub fn new(penalty: f64) -> Self {
        Self { penalty }
    }
}

impl Default for SimpleResponseLayoutCriterion {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl TaskCriterion for SimpleResponseLayoutCriterion {
    fn kind(&self) -> &'static str {
        "simple-response-layout"
    }

    fn penalty(&self) -> f64 {
        self.penalty
    }

    fn compose_text(&self) -> String {
        "The response must be plain prose, without lists or headings.".to_string()
    }

    fn score(&self, completion: &str) -> f64 {
        if has_list_lines(completion) || HEADING_LINE.is_match(completion) {
            self.penalty
        } else {
            0.0
        }
    }
}
