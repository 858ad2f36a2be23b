//! Events emitted by challenge rounds
//!
//! Data only: the host decides how to present them.

use serde::Serialize;

use super::input::Focus;
use crate::question::{Modality, Question, SubmittedAnswer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RoundEvent {
    QuestionStarted {
        index: usize,
        total: usize,
        modality: Modality,
        timer_secs: f32,
    },
    Hint {
        index: usize,
        text: String,
    },
    FocusMoved {
        focus: Focus,
    },
    ItemGrabbed {
        index: usize,
    },
    ItemDropped {
        index: usize,
    },
    ItemsSwapped {
        from: usize,
        to: usize,
    },
    PairAssigned {
        left: usize,
        right: usize,
        /// Left item that held `right` before, now unpaired
        taken_from: Option<usize>,
    },
    TimerExpired {
        index: usize,
    },
    AnswerSubmitted {
        index: usize,
        correct: bool,
        highlights: Vec<bool>,
        xp: u32,
    },
    SecondChanceUsed {
        index: usize,
        highlights: Vec<bool>,
    },
    QuestionReopened {
        index: usize,
    },
    RoundComplete(RoundResult),
}

/// Aggregate outcome of a finished round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundResult {
    pub total: usize,
    pub correct_count: usize,
    /// Strict majority correct
    pub is_correct: bool,
    pub xp_awarded: u32,
    pub results: Vec<bool>,
    pub summary: String,
}

/// Post-round review of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionInfo {
    pub index: usize,
    pub question: Question,
    pub submitted: SubmittedAnswer,
    pub correct: bool,
    pub highlights: Vec<bool>,
    pub correct_answer: String,
    pub explanation: String,
    pub xp: u32,
}
