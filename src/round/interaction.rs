//! Per-question interaction, picked from the question's payload.

use super::choice::{ChoiceInteraction, ChoiceKind};
use super::events::RoundEvent;
use super::input::{Focus, InputAction};
use super::matching::MatchingInteraction;
use super::ordering::OrderingInteraction;
use crate::question::{AnswerPayload, Question, SubmittedAnswer};

/// What one input produced
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<RoundEvent>,
    pub submission: Option<SubmittedAnswer>,
}

impl Step {
    pub fn event(event: RoundEvent) -> Self {
        Self {
            events: vec![event],
            submission: None,
        }
    }

    pub fn submit(answer: SubmittedAnswer) -> Self {
        Self {
            events: Vec::new(),
            submission: Some(answer),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Interaction {
    Choice(ChoiceInteraction),
    Ordering(OrderingInteraction),
    Matching(MatchingInteraction),
}

impl Interaction {
    /// Fresh interaction state for a question
    pub fn for_question(question: &Question) -> Self {
        match &question.payload {
            AnswerPayload::MultipleChoice { options, .. } => {
                Interaction::Choice(ChoiceInteraction::new(ChoiceKind::Multiple, options.len()))
            }
            AnswerPayload::TrueFalse { .. } => Interaction::Choice(ChoiceInteraction::new(ChoiceKind::TrueFalse, 2)),
            AnswerPayload::Ordering { items, .. } => Interaction::Ordering(OrderingInteraction::new(items.len())),
            AnswerPayload::Matching { left_items, .. } => {
                Interaction::Matching(MatchingInteraction::new(left_items.len()))
            }
        }
    }

    pub fn handle(&mut self, action: InputAction) -> Step {
        match self {
            Interaction::Choice(choice) => choice.handle(action),
            Interaction::Ordering(ordering) => ordering.handle(action),
            Interaction::Matching(matching) => matching.handle(action),
        }
    }

    /// The answer as it stands, submitted when the timer runs out
    pub fn current_answer(&self) -> SubmittedAnswer {
        match self {
            Interaction::Choice(choice) => choice.unanswered(),
            Interaction::Ordering(ordering) => ordering.current_answer(),
            Interaction::Matching(matching) => matching.current_answer(),
        }
    }

    pub fn focus(&self) -> Focus {
        match self {
            Interaction::Choice(choice) => choice.focus(),
            Interaction::Ordering(ordering) => ordering.focus(),
            Interaction::Matching(matching) => matching.focus(),
        }
    }

    pub fn submit_enabled(&self) -> bool {
        match self {
            Interaction::Choice(_) => true,
            Interaction::Ordering(ordering) => ordering.submit_enabled(),
            Interaction::Matching(matching) => matching.submit_enabled(),
        }
    }
}
