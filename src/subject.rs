//! Subjects and difficulty tiers.
//!
//! Shared by the question bank, the difficulty adapter and quest objectives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A school subject a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    Reading,
    Science,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Reading, Subject::Science];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Reading => "reading",
            Subject::Science => "science",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "math" | "maths" => Some(Subject::Math),
            "reading" => Some(Subject::Reading),
            "science" => Some(Subject::Science),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered difficulty levels: beginner < easy < medium < hard < advanced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    #[default]
    Beginner,
    Easy,
    Medium,
    Hard,
    Advanced,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 5] = [
        DifficultyTier::Beginner,
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
        DifficultyTier::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Beginner => "beginner",
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
            DifficultyTier::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(DifficultyTier::Beginner),
            "easy" => Some(DifficultyTier::Easy),
            "medium" => Some(DifficultyTier::Medium),
            "hard" => Some(DifficultyTier::Hard),
            "advanced" => Some(DifficultyTier::Advanced),
            _ => None,
        }
    }

    fn rank(&self) -> usize {
        *self as usize
    }

    /// One step harder, `None` at the ceiling
    pub fn next(&self) -> Option<Self> {
        Self::ALL.get(self.rank() + 1).copied()
    }

    /// One step easier, `None` at the floor
    pub fn previous(&self) -> Option<Self> {
        self.rank().checked_sub(1).map(|r| Self::ALL[r])
    }

    /// Number of steps between two tiers
    pub fn distance(&self, other: DifficultyTier) -> usize {
        self.rank().abs_diff(other.rank())
    }

    /// All tiers ordered by distance from `self`, easier tier first on ties
    pub fn by_distance(&self) -> Vec<DifficultyTier> {
        let mut tiers = Self::ALL.to_vec();
        tiers.sort_by_key(|t| (t.distance(*self), t.rank()));
        tiers
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_steps_clamp() {
        assert_eq!(DifficultyTier::Beginner.previous(), None);
        assert_eq!(DifficultyTier::Beginner.next(), Some(DifficultyTier::Easy));
        assert_eq!(DifficultyTier::Advanced.next(), None);
        assert_eq!(DifficultyTier::Advanced.previous(), Some(DifficultyTier::Hard));
    }

    #[test]
    fn test_tier_by_distance() {
        let order = DifficultyTier::Medium.by_distance();
        assert_eq!(
            order,
            vec![
                DifficultyTier::Medium,
                DifficultyTier::Easy,
                DifficultyTier::Hard,
                DifficultyTier::Beginner,
                DifficultyTier::Advanced,
            ]
        );
    }

    #[test]
    fn test_parsing() {
        assert_eq!(Subject::from_str("Math"), Some(Subject::Math));
        assert_eq!(Subject::from_str("art"), None);
        assert_eq!(DifficultyTier::from_str("hard"), Some(DifficultyTier::Hard));
        assert!(DifficultyTier::Beginner < DifficultyTier::Advanced);
    }
}
