//! Query-shape heuristics.
//!
//! # Responsibilities
//! - Flag queries too involved for a fixed template answer
//! - Length, keyword and multi-question checks, combined with OR
//!
//! # Design Decisions
//! - Keywords match whole words, case-insensitive; "vs" never matches "canvas"
//! - Multi-word keywords ("how does") match as a phrase
//! - No regex; queries are short and the rule set is small

use crate::config::ComplexityConfig;

/// One complexity test.
pub trait ComplexityRule: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if the query looks complex under this rule.
    fn matches(&self, query: &str) -> bool;
}

/// Matches queries longer than `max_chars` characters.
#[derive(Debug, Clone)]
pub struct LengthRule {
    max_chars: usize,
}

impl LengthRule {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl ComplexityRule for LengthRule {
    fn name(&self) -> &'static str {
        "length"
    }

    fn matches(&self, query: &str) -> bool {
        query.trim().chars().count() > self.max_chars
    }
}

/// Matches comparison, explanation and planning vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    /// Normalized and padded with spaces: `" how does "`.
    keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| normalize(k.as_ref()))
            .filter(|k| !k.trim().is_empty())
            .collect();
        Self { keywords }
    }
}

impl ComplexityRule for KeywordRule {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn matches(&self, query: &str) -> bool {
        let haystack = normalize(query);
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Matches queries with more than `max_question_marks` question marks.
#[derive(Debug, Clone)]
pub struct QuestionMarkRule {
    max_question_marks: usize,
}

impl QuestionMarkRule {
    pub fn new(max_question_marks: usize) -> Self {
        Self { max_question_marks }
    }
}

impl ComplexityRule for QuestionMarkRule {
    fn name(&self) -> &'static str {
        "question_marks"
    }

    fn matches(&self, query: &str) -> bool {
        query.chars().filter(|c| *c == '?').count() > self.max_question_marks
    }
}

/// Combines rules with OR semantics.
#[derive(Debug)]
pub struct AnyRule {
    rules: Vec<Box<dyn ComplexityRule>>,
}

impl AnyRule {
    pub fn new(rules: Vec<Box<dyn ComplexityRule>>) -> Self {
        Self { rules }
    }

    /// Length, keyword and question-mark rules from config.
    pub fn from_config(config: &ComplexityConfig) -> Self {
        Self::new(vec![
            Box::new(LengthRule::new(config.max_chars)),
            Box::new(KeywordRule::new(&config.keywords)),
            Box::new(QuestionMarkRule::new(config.max_question_marks)),
        ])
    }

    /// Name of the first rule that matches.
    pub fn first_match(&self, query: &str) -> Option<&'static str> {
        self.rules.iter().find(|r| r.matches(query)).map(|r| r.name())
    }
}

impl ComplexityRule for AnyRule {
    fn name(&self) -> &'static str {
        "any"
    }

    fn matches(&self, query: &str) -> bool {
        self.first_match(query).is_some()
    }
}

/// Lowercase, replace everything but letters and digits with single spaces,
/// and pad both ends so `" word "` tests whole-word containment.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.extend(word.chars().flat_map(char::to_lowercase));
        out.push(' ');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("How DOES it work?!"), " how does it work ");
        assert_eq!(normalize(""), " ");
    }

    #[test]
    fn test_keyword_whole_words_only() {
        let rule = KeywordRule::new(["vs", "plan", "how does"]);
        assert!(rule.matches("Kandy vs Ella"));
        assert!(rule.matches("Can you PLAN a day?"));
        assert!(rule.matches("How does the train work"));
        assert!(!rule.matches("Show me canvas shops"));
        assert!(!rule.matches("Any planes to Jaffna"));
        assert!(!rule.matches("how doesn't matter"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let rule = LengthRule::new(5);
        assert!(!rule.matches("කොළඹ"));
        assert!(rule.matches("abcdef"));
        assert!(!rule.matches("  abc  "));
    }

    #[test]
    fn test_question_marks() {
        let rule = QuestionMarkRule::new(1);
        assert!(!rule.matches("Where is Galle?"));
        assert!(rule.matches("Where is Galle? And Matara?"));
    }

    #[test]
    fn test_any_rule_reports_first_match() {
        let any = AnyRule::from_config(&ComplexityConfig::default());
        assert_eq!(any.first_match("Hello there"), None);
        assert_eq!(
            any.first_match("Why is Sigiriya important and how does it compare to Anuradhapura?"),
            Some("keyword")
        );
        assert_eq!(any.first_match(&"a ".repeat(100)), Some("length"));
        assert!(any.matches("Hotels? Trains?"));
    }
}
