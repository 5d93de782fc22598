use serde::{Deserialize, Serialize};

use super::{join_quoted, TaskCriterion};

/// Where a keyword has to appear in the completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMatchType {
    StartsWith,
    EndsWith,
    Includes,
}

impl ContentMatchType {
    fn verb(self) -> &'static str {
        match self {
            ContentMatchType::StartsWith => "start with",
            ContentMatchType::EndsWith => "end with",
            ContentMatchType::Includes => "include",
        }
    }

    fn matches(self, haystack: &str, needle: &str) -> bool {
        match self {
            ContentMatchType::StartsWith => haystack.starts_with(needle),
            ContentMatchType::EndsWith => haystack.ends_with(needle),
            ContentMatchType::Includes => haystack.contains(needle),
        }
    }
}

/// Every keyword must (or, when negated, must not) match the completion.
///
/// The penalty is proportional to the share of keywords breaking the rule.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContentCriterion {
    penalty: f64,
    keywords: Vec<String>,
    match_type: ContentMatchType,
    negate: bool,
    case_sensitive: bool,
}

impl MatchContentCriterion {
    pub fn new(penalty: f64, keywords: Vec<String>, match_type: ContentMatchType) -> Self {
        Self {
            penalty,
            keywords,
            match_type,
            negate: false,
            case_sensitive: false,
        }
    }

    /// Require the keywords to be absent instead
    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn keyword_noun(&self) -> &'static str {
        match (self.match_type, self.keywords.len()) {
            (ContentMatchType::Includes, 1) => "the word ",
            (ContentMatchType::Includes, _) => "the words ",
            _ => "",
        }
    }
}

impl TaskCriterion for MatchContentCriterion {
    fn kind(&self) -> &'static str {
        "content-match"
    }

    fn penalty(&self) -> f64 {
        self.penalty
    }

    fn compose_text(&self) -> String {
        format!(
            "The response must {}{} {}{}.",
            if self.negate { "not " } else { "" },
            self.match_type.verb(),
            self.keyword_noun(),
            join_quoted(&self.keywords)
        )
    }

    fn score(&self, completion: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }

        let normalize = |s: &str| {
            if self.case_sensitive {
                s.trim().to_string()
            } else {
                s.trim().to_lowercase()
            }
        };
        let haystack = normalize(completion);

        let violations = self
            .keywords
            .iter()
            .filter(|keyword| {
                let found = self.match_type.matches(&haystack, &normalize(keyword));
                found == self.negate
            })
            .count();

        self.penalty * violations as f64 / self.keywords.len() as f64
    }
}
