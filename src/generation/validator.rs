//! Heuristic check that extracted text looks like working source code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substrings of which at least one must appear in accepted code.
pub const DEFAULT_STRUCTURAL_INDICATORS: [&str; 5] = ["def ", "class ", "import ", "return ", " = "];

/// Minimum accepted code length, in characters.
pub const DEFAULT_MIN_ACCEPTED_LENGTH: usize = 20;

/// Why extracted text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("no structural code indicator found in the extracted text")]
    MissingIndicators,

    #[error("extracted code is too short ({length} < {minimum} characters)")]
    TooShort { length: usize, minimum: usize },
}

/// Acceptance rules for generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    pub structural_indicators: Vec<String>,
    pub min_accepted_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            structural_indicators: DEFAULT_STRUCTURAL_INDICATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_accepted_length: DEFAULT_MIN_ACCEPTED_LENGTH,
        }
    }
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the indicator set.
    pub fn with_indicators<I, S>(mut self, indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structural_indicators = indicators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_length(mut self, min_accepted_length: usize) -> Self {
        self.min_accepted_length = min_accepted_length;
        self
    }

    /// True iff `text` contains at least one structural indicator.
    pub fn looks_like_code(&self, text: &str) -> bool {
        self.structural_indicators
            .iter()
            .any(|indicator| text.contains(indicator.as_str()))
    }

    /// Indicator check plus the minimum length gate.
    pub fn check(&self, text: &str) -> Result<(), ValidationFailure> {
        if !self.looks_like_code(text) {
            return Err(ValidationFailure::MissingIndicators);
        }

        let length = text.chars().count();
        if length < self.min_accepted_length {
            return Err(ValidationFailure::TooShort {
                length,
                minimum: self.min_accepted_length,
            });
        }

        Ok(())
    }
}

/// [`ValidationRules::looks_like_code`] with the default rules.
pub fn looks_like_code(text: &str) -> bool {
    ValidationRules::default().looks_like_code(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_positivity() {
        assert!(looks_like_code("def f(): return 1"));
        assert!(!looks_like_code("hello world"));
    }

    #[test]
    fn test_each_default_indicator_is_enough() {
        for snippet in ["def x", "class X", "import os", "return 0", "a = b"] {
            assert!(looks_like_code(snippet), "expected {:?} to pass", snippet);
        }
        // Assignment needs the surrounding spaces.
        assert!(!looks_like_code("a=b"));
    }

    #[test]
    fn test_length_gate_rejects_short_code() {
        let rules = ValidationRules::default();
        let snippet = "def f(): 1";
        assert_eq!(snippet.chars().count(), 10);

        assert!(rules.looks_like_code(snippet));
        assert_eq!(
            rules.check(snippet),
            Err(ValidationFailure::TooShort {
                length: 10,
                minimum: 20
            })
        );
    }

    #[test]
    fn test_check_accepts_real_code() {
        let code = "def add(a, b):\n    return a + b";
        assert_eq!(ValidationRules::default().check(code), Ok(()));
    }

    #[test]
    fn test_check_reports_missing_indicators_first() {
        assert_eq!(
            ValidationRules::default().check("short"),
            Err(ValidationFailure::MissingIndicators)
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let rules = ValidationRules::default().with_min_length(12);
        // 12 characters, 15 bytes.
        let code = "x = \"ñññ\"  #";
        assert_eq!(code.chars().count(), 12);
        assert_eq!(rules.check(code), Ok(()));
    }

    #[test]
    fn test_overridden_rules() {
        let rules = ValidationRules::new()
            .with_indicators(["fn ", "let "])
            .with_min_length(5);

        assert!(rules.check("fn main() {}").is_ok());
        assert_eq!(
            rules.check("def f(): return 1"),
            Err(ValidationFailure::MissingIndicators)
        );
    }
}
