//! Banked Question
//!
//! A question plus its usage and mastery history for one learner.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::question::Question;

/// Where a banked question came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Static,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankedQuestion {
    pub question: Question,
    pub times_shown: u32,
    pub times_correct: u32,
    pub last_shown: Option<DateTime<Utc>>,
    pub added: DateTime<Utc>,
    pub source: QuestionSource,
}

impl BankedQuestion {
    pub fn new(question: Question, source: QuestionSource, added: DateTime<Utc>) -> Self {
        Self {
            question,
            times_shown: 0,
            times_correct: 0,
            last_shown: None,
            added,
            source,
        }
    }

    pub fn id(&self) -> &str {
        &self.question.id
    }

    /// Mastered once answered correctly `threshold` times, however often shown
    pub fn is_mastered(&self, threshold: u32) -> bool {
        self.times_correct >= threshold
    }

    pub fn accuracy_rate(&self) -> f32 {
        if self.times_shown == 0 {
            return 0.0;
        }
        self.times_correct as f32 / self.times_shown as f32
    }

    /// Record one showing of this question
    pub fn record(&mut self, correct: bool, now: DateTime<Utc>) {
        self.times_shown += 1;
        if correct {
            self.times_correct += 1;
        }
        self.last_shown = Some(now);
    }

    /// Mastered and unseen for longer than the grace period
    pub fn removal_eligible(&self, threshold: u32, grace: Duration, now: DateTime<Utc>) -> bool {
        if !self.is_mastered(threshold) {
            return false;
        }
        let since = self.last_shown.unwrap_or(self.added);
        now - since > grace
    }
}
