//! Multiple-choice and true/false interaction.

use super::events::RoundEvent;
use super::input::{Focus, InputAction};
use super::interaction::Step;
use crate::question::SubmittedAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Four options
    Multiple,
    /// Options are `[true, false]`
    TrueFalse,
}

#[derive(Debug, Clone)]
pub struct ChoiceInteraction {
    kind: ChoiceKind,
    option_count: usize,
    focus: usize,
}

impl ChoiceInteraction {
    pub fn new(kind: ChoiceKind, option_count: usize) -> Self {
        Self {
            kind,
            option_count,
            focus: 0,
        }
    }

    pub fn focus(&self) -> Focus {
        Focus::Item(self.focus)
    }

    pub fn handle(&mut self, action: InputAction) -> Step {
        match action {
            InputAction::MoveUp if self.focus > 0 => {
                self.focus -= 1;
                Step::event(RoundEvent::FocusMoved { focus: self.focus() })
            }
            InputAction::MoveDown if self.focus + 1 < self.option_count => {
                self.focus += 1;
                Step::event(RoundEvent::FocusMoved { focus: self.focus() })
            }
            InputAction::Confirm => Step::submit(self.answer(Some(self.focus))),
            InputAction::Select(i) if i < self.option_count => {
                self.focus = i;
                Step::submit(self.answer(Some(i)))
            }
            _ => Step::default(),
        }
    }

    /// Nothing was chosen; used when the timer runs out
    pub fn unanswered(&self) -> SubmittedAnswer {
        self.answer(None)
    }

    fn answer(&self, choice: Option<usize>) -> SubmittedAnswer {
        match self.kind {
            ChoiceKind::Multiple => SubmittedAnswer::Choice(choice),
            ChoiceKind::TrueFalse => SubmittedAnswer::TrueFalse(choice.map(|i| i == 0)),
        }
    }
}
