//! Types shared by catalog clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty level of a catalog problem, stored as `Easy`, `Medium` or `Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All levels in catalog order.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Map the catalog's numeric level (1, 2, 3).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Difficulty::Easy),
            2 => Some(Difficulty::Medium),
            3 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Problem entry from the catalog list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSummary {
    pub title: String,
    pub slug: String,
    pub difficulty: Difficulty,
}

/// Source of programming challenges.
///
/// Implementations never fail: list errors yield an empty list and
/// statement errors yield a placeholder text.
#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    /// Free problems, easy then medium then hard.
    async fn fetch_problem_list(&self) -> Vec<ProblemSummary>;

    /// Statement markup for the problem with the given slug.
    async fn fetch_statement(&self, slug: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_levels() {
        assert_eq!(Difficulty::from_level(1), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_level(3), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_level(0), None);
        assert_eq!(Difficulty::from_level(4), None);
    }

    #[test]
    fn test_difficulty_parse_and_display() {
        assert_eq!("Medium".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!(" hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.to_string(), "Easy");
    }

    #[test]
    fn test_difficulty_serde_matches_storage_form() {
        let json = serde_json::to_string(&Difficulty::Medium).expect("serialize");
        assert_eq!(json, "\"Medium\"");
    }
}
