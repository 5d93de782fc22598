use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TaskCriterion;

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?…]+").unwrap();
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n").unwrap();
}

/// Words whose trailing period does not end a sentence
const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st"];

/// Closing marks that may sit between a terminator and the next sentence
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '*'];

/// Opening marks that may start a sentence in place of a capital letter
const OPENERS: &[char] = &['"', '\'', '“', '‘', '(', '[', '*'];

/// Count sentences in `text`.
///
/// A run of terminators ends a sentence only at the end of the text or
/// when whitespace and a capital letter (or an opening quote) follow it.
/// Decimal points and honorifics such as "Dr." never end a sentence.
fn count_sentences(text: &str) -> usize {
    let mut count = 0;
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        let before = &text[..m.start()];
        let after = &text[m.end()..];

        if m.as_str() == "." {
            let digit_before = before
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit());
            let digit_after = after.chars().next().is_some_and(|c| c.is_ascii_digit());
            if digit_before && digit_after {
                continue;
            }

            let word: String = before
                .chars()
                .rev()
                .take_while(|c| c.is_alphabetic())
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if HONORIFICS.contains(&word.to_lowercase().as_str()) {
                continue;
            }
        }

        let rest = after.trim_start_matches(CLOSERS);
        let ends_here = match rest.chars().next() {
            None => true,
            Some(c) if c.is_whitespace() => match rest.trim_start().chars().next() {
                None => true,
                Some(next) => {
                    next.is_uppercase() || next.is_ascii_digit() || OPENERS.contains(&next)
                }
            },
            Some(_) => false,
        };
        if !ends_here {
            continue;
        }

        let end = text.len() - rest.len();
        if text[start..end].chars().any(char::is_alphanumeric) {
            count += 1;
        }
        start = end;
    }

    if text[start..].chars().any(char::is_alphanumeric) {
        count += 1;
    }
    count
}

/// Unit a completion's length is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLengthUnit {
    Characters,
    Words,
    Sentences,
    Paragraphs,
}

impl TextLengthUnit {
    /// Length of `text` in this unit
    pub fn count(self, text: &str) -> usize {
        let text = text.trim();
        match self {
            TextLengthUnit::Characters => text.chars().count(),
            TextLengthUnit::Words => text.split_whitespace().count(),
            TextLengthUnit::Sentences => count_sentences(text),
            TextLengthUnit::Paragraphs => PARAGRAPH_BREAK
                .split(text)
                .filter(|p| !p.trim().is_empty())
                .count(),
        }
    }

    fn label(self, amount: usize) -> &'static str {
        match (self, amount == 1) {
            (TextLengthUnit::Characters, true) => "character",
            (TextLengthUnit::Characters, false) => "characters",
            (TextLengthUnit::Words, true) => "word",
            (TextLengthUnit::Words, false) => "words",
            (TextLengthUnit::Sentences, true) => "sentence",
            (TextLengthUnit::Sentences, false) => "sentences",
            (TextLengthUnit::Paragraphs, true) => "paragraph",
            (TextLengthUnit::Paragraphs, false) => "paragraphs",
        }
    }
}

impl std::fmt::Display for TextLengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label(2))
    }
}

/// The completion should be `target_length` units long.
///
/// The penalty grows linearly with the relative distance from the target
/// and saturates at the full penalty once the distance reaches the target
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchLengthCriterion {
    penalty: f64,
    target_length: usize,
    unit: TextLengthUnit,
}

impl MatchLengthCriterion {
    pub fn new(penalty: f64, target_length: usize, unit: TextLengthUnit) -> Self {
        Self {
            penalty,
            target_length,
            unit,
        }
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn unit(&self) -> TextLengthUnit {
        self.unit
    }
}

impl TaskCriterion for MatchLengthCriterion {
    fn kind(&self) -> &'static str {
        "length-match"
    }

    fn penalty(&self) -> f64 {
        self.penalty
    }

    fn compose_text(&self) -> String {
        format!(
            "The response must be {} {} long.",
            self.target_length,
            self.unit.label(self.target_length)
        )
    }

    fn score(&self, completion: &str) -> f64 {
        let actual = self.unit.count(completion);
        let distance = actual.abs_diff(self.target_length) as f64;

        let ratio = if self.target_length == 0 {
            if distance > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            (distance / self.target_length as f64).min(1.0)
        };

        self.penalty * ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_count_units() {
        let text = "Hello there. How are you?\n\nI am fine!  Thanks...";
        assert_eq!(TextLengthUnit::Words.count(text), 9);
        assert_eq!(TextLengthUnit::Sentences.count(text), 4);
        assert_eq!(TextLengthUnit::Paragraphs.count(text), 2);
        assert_eq!(TextLengthUnit::Characters.count("  abc  "), 3);
        assert_eq!(TextLengthUnit::Sentences.count(""), 0);
    }

    #[test]
    fn test_sentences_ignore_abbreviations_and_decimals() {
        let text = "Dr. Ava paid 3.50 credits for the part. She smiled at Mr. Bolt.";
        assert_eq!(TextLengthUnit::Sentences.count(text), 2);
        assert_eq!(TextLengthUnit::Sentences.count("Mrs. Hale waited... and waited."), 1);
        assert_eq!(
            TextLengthUnit::Sentences.count("\"Run!\" she cried. *He turns away.* Fine?"),
            3
        );

        let criterion = MatchLengthCriterion::new(0.25, 2, TextLengthUnit::Sentences);
        assert_eq!(criterion.score(text), 0.0);
    }

    #[test]
    fn test_exact_length_scores_zero() {
        let criterion = MatchLengthCriterion::new(0.25, 100, TextLengthUnit::Words);
        assert_eq!(criterion.score(&words(100)), 0.0);
    }

    #[test]
    fn test_penalty_is_monotone_and_bounded() {
        let criterion = MatchLengthCriterion::new(0.25, 50, TextLengthUnit::Words);
        let mut previous = 0.0;
        for distance in 0..=120 {
            let longer = criterion.score(&words(50 + distance));
            assert!(longer >= previous);
            assert!(longer <= 0.25);
            if distance <= 50 {
                let shorter = criterion.score(&words(50 - distance));
                assert!((shorter - longer).abs() < 1e-12);
            }
            previous = longer;
        }
        assert_eq!(criterion.score(&words(100)), 0.25);
        assert!((criterion.score(&words(60)) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_zero_target() {
        let criterion = MatchLengthCriterion::new(0.5, 0, TextLengthUnit::Sentences);
        assert_eq!(criterion.score(""), 0.0);
        assert_eq!(criterion.score("One sentence."), 0.5);
    }

    #[test]
    fn test_compose_text() {
        let criterion = MatchLengthCriterion::new(0.25, 100, TextLengthUnit::Words);
        assert_eq!(criterion.compose_text(), "The response must be 100 words long.");
        let single = MatchLengthCriterion::new(0.25, 1, TextLengthUnit::Paragraphs);
        assert_eq!(single.compose_text(), "The response must be 1 paragraph long.");
    }
}
