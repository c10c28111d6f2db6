//! Birth-details extraction from free text.
//!
//! Each field has an ordered list of patterns; the first pattern that matches
//! anywhere in the text wins for that field:
//! - date: numeric `D/M/Y` or textual `D Month Y`, then `born on <phrase>`
//! - time: `H:MM` with optional AM/PM, or bare `H AM/PM`
//! - place: text after `born in`, `birth place`, `place of birth` or `in`
//!
//! Extraction returns `None` when no field matched at all, so callers can tell
//! "no information" apart from an empty set.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::model::{BirthDetails, fields};

/// Default extractor shared by the controller.
static DEFAULT_EXTRACTOR: LazyLock<BirthDetailsExtractor> =
    LazyLock::new(BirthDetailsExtractor::default_patterns);

/// Extract birth details with the default patterns.
pub fn extract_birth_details(text: &str) -> Option<BirthDetails> {
    DEFAULT_EXTRACTOR.extract(text)
}

/// A single field pattern with a compiled regex.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    /// Human-readable pattern description.
    pub description: String,
    /// Compiled regex for matching.
    pub regex: Regex,
    /// Capture group holding the field value.
    pub group: usize,
}

impl FieldPattern {
    fn new(description: &str, pattern: &str, group: usize) -> Self {
        Self {
            description: description.into(),
            regex: Regex::new(pattern).unwrap(),
            group,
        }
    }

    /// Value captured by this pattern, trailing spaces and commas trimmed.
    fn capture(&self, text: &str) -> Option<String> {
        let caps = self.regex.captures(text)?;
        let value = caps
            .get(self.group)?
            .as_str()
            .trim_end_matches(|c: char| c.is_whitespace() || c == ',')
            .trim_start();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Ordered patterns for one birth-details field.
#[derive(Debug, Clone)]
struct FieldRule {
    field: &'static str,
    patterns: Vec<FieldPattern>,
}

/// Pattern-based birth-details extractor.
#[derive(Debug, Clone)]
pub struct BirthDetailsExtractor {
    rules: Vec<FieldRule>,
}

impl BirthDetailsExtractor {
    /// Create an extractor with the default date/time/place patterns.
    pub fn default_patterns() -> Self {
        let date = FieldRule {
            field: fields::DATE,
            patterns: vec![
                FieldPattern::new(
                    "numeric D/M/Y or textual D Month Y",
                    r"([0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{2,4}|[0-9]{1,2} [a-zA-Z]+ [0-9]{2,4})",
                    1,
                ),
                FieldPattern::new("born on <phrase>", r"(?i)born on\s+([A-Za-z\s0-9,]+)", 1),
            ],
        };

        let time = FieldRule {
            field: fields::TIME,
            patterns: vec![FieldPattern::new(
                "H:MM [AM|PM] or H AM|PM",
                r"(?i)([0-9]{1,2}:[0-9]{2}(?: ?(?:AM|PM)\b)?|[0-9]{1,2} ?(?:AM|PM)\b)",
                1,
            )],
        };

        let place = FieldRule {
            field: fields::PLACE,
            patterns: vec![FieldPattern::new(
                "text after a place cue",
                r"(?i)\b(?:born in|birth place|place of birth|in) ([A-Za-z\s,]+)",
                1,
            )],
        };

        Self {
            rules: vec![date, time, place],
        }
    }

    /// Extract whatever fields the text contains.
    pub fn extract(&self, text: &str) -> Option<BirthDetails> {
        let mut details = BirthDetails::new();

        for rule in &self.rules {
            let matched = rule
                .patterns
                .iter()
                .find_map(|p| p.capture(text).map(|value| (p, value)));
            if let Some((pattern, value)) = matched {
                debug!(
                    field = rule.field,
                    pattern = %pattern.description,
                    "Birth detail extracted"
                );
                details.insert(rule.field, value);
            }
        }

        (!details.is_empty()).then_some(details)
    }
}
