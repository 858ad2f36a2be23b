//! Challenge Rounds
//!
//! A round is a fixed list of questions played one at a time:
//! - Each question runs on a countdown; when it expires the answer is
//!   submitted as it stands
//! - Every submission is followed by a feedback pause that ignores input
//! - The host drives the round with `handle_input` and `update(delta)` and
//!   renders the returned events

pub mod choice;
pub mod events;
pub mod input;
pub mod interaction;
pub mod matching;
pub mod ordering;

pub use events::{CorrectionInfo, RoundEvent, RoundResult};
pub use input::{Abilities, Focus, InputAction};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RoundConfig;
use crate::error::RoundError;
use crate::question::{Grade, Modality, Question, SubmittedAnswer};
use interaction::Interaction;

/// Which questions a round accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    MultipleChoice,
    TrueFalse,
    Ordering,
    Matching,
    /// Any shape, chosen per question
    Mixed,
}

impl RoundKind {
    /// The single modality this kind accepts, `None` for mixed rounds
    pub fn modality(&self) -> Option<Modality> {
        match self {
            RoundKind::MultipleChoice => Some(Modality::MultipleChoice),
            RoundKind::TrueFalse => Some(Modality::TrueFalse),
            RoundKind::Ordering => Some(Modality::Ordering),
            RoundKind::Matching => Some(Modality::Matching),
            RoundKind::Mixed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundKind::MultipleChoice => "multiple_choice",
            RoundKind::TrueFalse => "true_false",
            RoundKind::Ordering => "ordering",
            RoundKind::Matching => "matching",
            RoundKind::Mixed => "mixed",
        }
    }
}

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundPhase {
    /// Created, `build` not called yet
    Pending,
    Answering,
    /// Input ignored until `remaining` runs out. `reopen` replays the same
    /// question after a second chance.
    Feedback { remaining: f32, reopen: bool },
    Complete,
    Cancelled,
}

/// What was recorded for one question
#[derive(Debug, Clone)]
struct QuestionRecord {
    submitted: SubmittedAnswer,
    grade: Grade,
    xp: u32,
}

pub struct ChallengeRound {
    kind: RoundKind,
    questions: Vec<Question>,
    abilities: Abilities,
    config: RoundConfig,
    index: usize,
    phase: RoundPhase,
    interaction: Option<Interaction>,
    timer_total: f32,
    timer_remaining: f32,
    records: Vec<Option<QuestionRecord>>,
    second_chance_used: bool,
}

impl ChallengeRound {
    pub fn new(
        kind: RoundKind,
        questions: Vec<Question>,
        abilities: Abilities,
        config: &RoundConfig,
    ) -> Result<Self, RoundError> {
        if questions.is_empty() {
            return Err(RoundError::Empty);
        }
        if let Some(expected) = kind.modality() {
            if let Some(q) = questions.iter().find(|q| q.modality() != expected) {
                return Err(RoundError::ModalityMismatch {
                    id: q.id.clone(),
                    expected: expected.as_str(),
                    found: q.modality().as_str(),
                });
            }
        }

        let records = vec![None; questions.len()];
        Ok(Self {
            kind,
            questions,
            abilities,
            config: config.clone(),
            index: 0,
            phase: RoundPhase::Pending,
            interaction: None,
            timer_total: 0.0,
            timer_remaining: 0.0,
            records,
            second_chance_used: false,
        })
    }

    /// Start the first question
    pub fn build(&mut self) -> Vec<RoundEvent> {
        if self.phase != RoundPhase::Pending {
            return Vec::new();
        }
        debug!(kind = self.kind.as_str(), questions = self.questions.len(), "Round started");
        self.start_question(0)
    }

    pub fn handle_input(&mut self, action: InputAction) -> Vec<RoundEvent> {
        if self.phase != RoundPhase::Answering {
            return Vec::new();
        }
        let Some(interaction) = self.interaction.as_mut() else {
            return Vec::new();
        };

        let step = interaction.handle(action);
        let mut events = step.events;
        if let Some(answer) = step.submission {
            events.extend(self.submit(answer));
        }
        events
    }

    /// Advance timers by `delta` seconds
    pub fn update(&mut self, delta: f32) -> Vec<RoundEvent> {
        match self.phase {
            RoundPhase::Answering => {
                self.timer_remaining -= delta;
                if self.timer_remaining > 0.0 {
                    return Vec::new();
                }
                self.timer_remaining = 0.0;
                let answer = match &self.interaction {
                    Some(interaction) => interaction.current_answer(),
                    None => return Vec::new(),
                };
                let mut events = vec![RoundEvent::TimerExpired { index: self.index }];
                events.extend(self.submit(answer));
                events
            }
            RoundPhase::Feedback { remaining, reopen } => {
                let remaining = remaining - delta;
                if remaining > 0.0 {
                    self.phase = RoundPhase::Feedback { remaining, reopen };
                    return Vec::new();
                }
                if reopen {
                    let mut events = vec![RoundEvent::QuestionReopened { index: self.index }];
                    events.extend(self.start_question(self.index));
                    return events;
                }
                if self.index + 1 < self.questions.len() {
                    self.start_question(self.index + 1)
                } else {
                    self.phase = RoundPhase::Complete;
                    self.interaction = None;
                    let result = self.aggregate_result();
                    debug!(summary = %result.summary, "Round complete");
                    vec![RoundEvent::RoundComplete(result)]
                }
            }
            RoundPhase::Pending | RoundPhase::Complete | RoundPhase::Cancelled => Vec::new(),
        }
    }

    /// Abandon the round; later input and updates are ignored
    pub fn teardown(&mut self) {
        self.interaction = None;
        if self.phase != RoundPhase::Complete {
            self.phase = RoundPhase::Cancelled;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RoundPhase::Complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase == RoundPhase::Cancelled
    }

    pub fn kind(&self) -> RoundKind {
        self.kind
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    /// Remaining share of the question timer, 1.0 at the start
    pub fn timer_fraction(&self) -> f32 {
        if self.timer_total <= 0.0 {
            return 0.0;
        }
        (self.timer_remaining / self.timer_total).clamp(0.0, 1.0)
    }

    pub fn submit_enabled(&self) -> bool {
        self.phase == RoundPhase::Answering && self.interaction.as_ref().is_some_and(Interaction::submit_enabled)
    }

    pub fn focus(&self) -> Option<Focus> {
        self.interaction.as_ref().map(Interaction::focus)
    }

    pub fn second_chance_available(&self) -> bool {
        self.abilities.second_chance && !self.second_chance_used
    }

    pub fn all_round_questions(&self) -> &[Question] {
        &self.questions
    }

    /// Per-question outcomes, in order. Unrecorded questions count as wrong.
    pub fn results(&self) -> Vec<bool> {
        self.records
            .iter()
            .map(|r| r.as_ref().is_some_and(|r| r.grade.correct))
            .collect()
    }

    pub fn aggregate_result(&self) -> RoundResult {
        let total = self.questions.len();
        let missing = self.records.iter().filter(|r| r.is_none()).count();
        debug_assert!(missing == 0, "aggregating a round with {} unanswered questions", missing);
        if missing > 0 {
            warn!(missing, total, "Aggregating round with unanswered questions, counting them wrong");
        }

        let results = self.results();
        let correct_count = results.iter().filter(|c| **c).count();
        let xp_awarded: u32 = self.records.iter().flatten().map(|r| r.xp).sum();
        RoundResult {
            total,
            correct_count,
            is_correct: correct_count * 2 > total,
            xp_awarded,
            summary: format!("{} of {} correct, +{} XP", correct_count, total, xp_awarded),
            results,
        }
    }

    /// Review data for a recorded question
    pub fn correction_info(&self, index: usize) -> Option<CorrectionInfo> {
        let record = self.records.get(index)?.as_ref()?;
        let question = self.questions.get(index)?;
        Some(CorrectionInfo {
            index,
            question: question.clone(),
            submitted: record.submitted.clone(),
            correct: record.grade.correct,
            highlights: record.grade.highlights.clone(),
            correct_answer: question.payload.correct_answer_text(),
            explanation: question.explanation.clone(),
            xp: record.xp,
        })
    }

    fn start_question(&mut self, index: usize) -> Vec<RoundEvent> {
        let Some(question) = self.questions.get(index) else {
            return Vec::new();
        };
        self.index = index;
        self.interaction = Some(Interaction::for_question(question));
        self.timer_total = self.config.timer_for(question.modality());
        self.timer_remaining = self.timer_total;
        self.phase = RoundPhase::Answering;

        let mut events = vec![RoundEvent::QuestionStarted {
            index,
            total: self.questions.len(),
            modality: question.modality(),
            timer_secs: self.timer_total,
        }];
        if self.abilities.hint {
            events.push(RoundEvent::Hint {
                index,
                text: question.hint(),
            });
        }
        events
    }

    fn submit(&mut self, answer: SubmittedAnswer) -> Vec<RoundEvent> {
        let Some(question) = self.questions.get(self.index) else {
            return Vec::new();
        };
        let grade = question.payload.grade(&answer);
        let feedback = self.config.feedback_pause_secs;

        if !grade.correct && self.second_chance_available() {
            self.second_chance_used = true;
            self.phase = RoundPhase::Feedback {
                remaining: feedback,
                reopen: true,
            };
            debug!(index = self.index, "Second chance used");
            return vec![RoundEvent::SecondChanceUsed {
                index: self.index,
                highlights: grade.highlights,
            }];
        }

        let xp = self.xp_for(grade.correct);
        let event = RoundEvent::AnswerSubmitted {
            index: self.index,
            correct: grade.correct,
            highlights: grade.highlights.clone(),
            xp,
        };
        self.records[self.index] = Some(QuestionRecord {
            submitted: answer,
            grade,
            xp,
        });
        self.phase = RoundPhase::Feedback {
            remaining: feedback,
            reopen: false,
        };
        vec![event]
    }

    /// Base XP plus a speed bonus for correct answers
    fn xp_for(&self, correct: bool) -> u32 {
        if !correct {
            return self.config.wrong_xp;
        }
        let fraction = self.timer_fraction();
        let bonus = if fraction > 2.0 / 3.0 {
            2
        } else if fraction > 1.0 / 3.0 {
            1
        } else {
            0
        };
        self.config.correct_xp + bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::AnswerPayload;
    use crate::subject::{DifficultyTier, Subject};

    fn mc(id: &str, correct_index: usize) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            payload: AnswerPayload::MultipleChoice {
                options: ["w".into(), "x".into(), "y".into(), "z".into()],
                correct_index,
            },
            explanation: "because".to_string(),
            subject: Subject::Math,
            tier: DifficultyTier::Beginner,
            grade_level: 1,
        }
    }

    fn ordering() -> Question {
        Question {
            id: "ord".to_string(),
            text: "Alphabetical order".to_string(),
            payload: AnswerPayload::Ordering {
                items: vec!["cherry".into(), "apple".into(), "banana".into(), "date".into()],
                correct_order: vec![1, 2, 0, 3],
            },
            explanation: String::new(),
            subject: Subject::Reading,
            tier: DifficultyTier::Beginner,
            grade_level: 1,
        }
    }

    fn round(questions: Vec<Question>, abilities: Abilities) -> ChallengeRound {
        let mut round = ChallengeRound::new(RoundKind::Mixed, questions, abilities, &RoundConfig::default()).unwrap();
        round.build();
        round
    }

    fn finish_feedback(round: &mut ChallengeRound) -> Vec<RoundEvent> {
        round.update(RoundConfig::default().feedback_pause_secs + 0.01)
    }

    #[test]
    fn test_new_validates_questions() {
        let config = RoundConfig::default();
        assert!(matches!(
            ChallengeRound::new(RoundKind::MultipleChoice, vec![], Abilities::default(), &config),
            Err(RoundError::Empty)
        ));
        let err = ChallengeRound::new(RoundKind::MultipleChoice, vec![mc("a", 0), ordering()], Abilities::default(), &config)
            .err()
            .unwrap();
        assert_eq!(
            err,
            RoundError::ModalityMismatch {
                id: "ord".into(),
                expected: "multiple_choice",
                found: "ordering"
            }
        );
    }

    #[test]
    fn test_aggregate_three_of_five() {
        let questions: Vec<Question> = (0..5).map(|i| mc(&format!("q{}", i), 0)).collect();
        let mut round = round(questions, Abilities::default());

        let mut complete = None;
        for (i, correct) in [true, true, false, true, false].iter().enumerate() {
            assert_eq!(round.current_index(), i);
            // Answer after 15 s of the 30 s timer: correct earns 10 + 1
            round.update(15.0);
            let choice = if *correct { 0 } else { 1 };
            round.handle_input(InputAction::Select(choice));
            assert!(!round.is_complete());
            for event in finish_feedback(&mut round) {
                if let RoundEvent::RoundComplete(result) = event {
                    complete = Some(result);
                }
            }
        }

        let result = complete.expect("round should complete");
        assert!(round.is_complete());
        assert_eq!(result.correct_count, 3);
        assert!(result.is_correct);
        assert_eq!(result.xp_awarded, 3 * 11 + 2 * 2);
        assert_eq!(result.summary, "3 of 5 correct, +37 XP");
        assert_eq!(result, round.aggregate_result());
    }

    #[test]
    fn test_two_of_five_is_not_passed() {
        let questions: Vec<Question> = (0..5).map(|i| mc(&format!("q{}", i), 0)).collect();
        let mut round = round(questions, Abilities::default());
        for correct in [true, false, false, true, false] {
            round.handle_input(InputAction::Select(if correct { 0 } else { 2 }));
            finish_feedback(&mut round);
        }
        let result = round.aggregate_result();
        assert_eq!(result.correct_count, 2);
        assert!(!result.is_correct);
        assert_eq!(result.xp_awarded, 2 * 12 + 3 * 2);
    }

    #[test]
    fn test_time_bonus_bands() {
        let mut round = round(vec![mc("a", 0), mc("b", 0), mc("c", 0)], Abilities::default());
        let mut xp = Vec::new();
        for elapsed in [5.0, 15.0, 25.0] {
            round.update(elapsed);
            for event in round.handle_input(InputAction::Confirm) {
                if let RoundEvent::AnswerSubmitted { xp: gained, .. } = event {
                    xp.push(gained);
                }
            }
            finish_feedback(&mut round);
        }
        assert_eq!(xp, vec![12, 11, 10]);
    }

    #[test]
    fn test_second_chance_intercepts_first_wrong() {
        let abilities = Abilities {
            second_chance: true,
            hint: false,
        };
        let mut round = round(vec![mc("a", 2), mc("b", 2)], abilities);

        let events = round.handle_input(InputAction::Select(0));
        assert!(matches!(events.as_slice(), [RoundEvent::SecondChanceUsed { index: 0, .. }]));
        assert!(round.correction_info(0).is_none());
        assert!(!round.second_chance_available());

        // Input is ignored during the pause, then the same question reopens
        assert!(round.handle_input(InputAction::Select(2)).is_empty());
        round.update(0.5);
        let events = finish_feedback(&mut round);
        assert!(matches!(events[0], RoundEvent::QuestionReopened { index: 0 }));
        assert_eq!(round.current_index(), 0);
        assert_eq!(round.timer_fraction(), 1.0);
        assert_eq!(round.focus(), Some(Focus::Item(0)));

        round.handle_input(InputAction::Select(2));
        assert!(round.correction_info(0).is_some_and(|c| c.correct));
        finish_feedback(&mut round);

        // Already consumed: the next wrong answer is recorded
        let events = round.handle_input(InputAction::Select(1));
        assert!(matches!(events.as_slice(), [RoundEvent::AnswerSubmitted { correct: false, xp: 2, .. }]));
    }

    #[test]
    fn test_second_wrong_answer_after_second_chance_is_recorded() {
        let abilities = Abilities {
            second_chance: true,
            hint: false,
        };
        let mut round = round(vec![mc("a", 2), mc("b", 2)], abilities);

        let events = round.handle_input(InputAction::Select(0));
        assert!(matches!(events.as_slice(), [RoundEvent::SecondChanceUsed { index: 0, .. }]));
        finish_feedback(&mut round);
        assert_eq!(round.current_index(), 0);

        let events = round.handle_input(InputAction::Select(1));
        assert!(matches!(
            events.as_slice(),
            [RoundEvent::AnswerSubmitted { index: 0, correct: false, xp: 2, .. }]
        ));
        assert!(round.correction_info(0).is_some_and(|c| !c.correct));
        assert!(!round.results()[0]);

        let events = finish_feedback(&mut round);
        assert!(matches!(events[0], RoundEvent::QuestionStarted { index: 1, .. }));
        assert_eq!(round.current_index(), 1);
    }

    #[test]
    fn test_timer_expiry_submits_current_answer() {
        let mut round = round(vec![ordering()], Abilities::default());
        // Leave the items unmoved and let the 45 s run out
        let events = round.update(46.0);
        assert_eq!(events[0], RoundEvent::TimerExpired { index: 0 });
        assert!(matches!(
            &events[1],
            RoundEvent::AnswerSubmitted { correct: false, highlights, xp: 2, .. } if highlights == &vec![true, true, true, false]
        ));

        let info = round.correction_info(0).unwrap();
        assert_eq!(info.submitted, SubmittedAnswer::Ordering(vec![0, 1, 2, 3]));
        assert_eq!(info.correct_answer, "apple → banana → cherry → date");

        let events = finish_feedback(&mut round);
        assert!(matches!(events.as_slice(), [RoundEvent::RoundComplete(r)] if r.correct_count == 0));
        assert!(round.is_complete());
    }

    #[test]
    fn test_hint_at_every_question_start() {
        let abilities = Abilities {
            second_chance: true,
            hint: true,
        };
        let mut round = ChallengeRound::new(RoundKind::Mixed, vec![ordering()], abilities, &RoundConfig::default()).unwrap();
        let events = round.build();
        assert_eq!(
            events[1],
            RoundEvent::Hint {
                index: 0,
                text: "\"apple\" comes first.".into()
            }
        );

        // Wrong submit, second chance, hint again on reopen
        round.handle_input(InputAction::MoveDown);
        round.handle_input(InputAction::MoveDown);
        round.handle_input(InputAction::MoveDown);
        round.handle_input(InputAction::MoveDown);
        round.handle_input(InputAction::Confirm);
        let events = finish_feedback(&mut round);
        assert!(events.iter().any(|e| matches!(e, RoundEvent::Hint { .. })));
    }

    #[test]
    fn test_teardown_ignores_further_input() {
        let mut round = round(vec![mc("a", 0)], Abilities::default());
        round.teardown();
        assert!(round.is_cancelled());
        assert!(round.handle_input(InputAction::Confirm).is_empty());
        assert!(round.update(100.0).is_empty());
        assert!(!round.is_complete());
        assert_eq!(round.focus(), None);
    }

    #[test]
    fn test_mixed_round_uses_payload_interaction() {
        let mut round = round(vec![ordering(), mc("b", 1)], Abilities::default());
        assert_eq!(round.focus(), Some(Focus::Item(0)));
        assert!(!round.submit_enabled());
        round.handle_input(InputAction::Confirm);
        round.handle_input(InputAction::MoveDown);
        assert!(round.submit_enabled());
        assert_eq!(round.all_round_questions().len(), 2);
    }
}
