//! Matching interaction
//!
//! The cursor walks the left column; confirming a left entry opens the
//! right column to pick its partner. Each right entry pairs with at most
//! one left entry.

use super::events::RoundEvent;
use super::input::{Focus, InputAction};
use super::interaction::Step;
use crate::question::SubmittedAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingState {
    Navigating { focus: usize },
    Picking { left: usize, right_focus: usize },
    SubmitFocused,
}

#[derive(Debug, Clone)]
pub struct MatchingInteraction {
    pairs: Vec<Option<usize>>,
    state: MatchingState,
}

impl MatchingInteraction {
    pub fn new(pair_count: usize) -> Self {
        Self {
            pairs: vec![None; pair_count],
            state: MatchingState::Navigating { focus: 0 },
        }
    }

    pub fn state(&self) -> MatchingState {
        self.state
    }

    pub fn pairs(&self) -> &[Option<usize>] {
        &self.pairs
    }

    pub fn focus(&self) -> Focus {
        match self.state {
            MatchingState::Navigating { focus } => Focus::Item(focus),
            MatchingState::Picking { right_focus, .. } => Focus::Right(right_focus),
            MatchingState::SubmitFocused => Focus::Submit,
        }
    }

    pub fn submit_enabled(&self) -> bool {
        self.pairs.iter().all(Option::is_some)
    }

    pub fn current_answer(&self) -> SubmittedAnswer {
        SubmittedAnswer::Matching(self.pairs.clone())
    }

    pub fn handle(&mut self, action: InputAction) -> Step {
        let last = self.pairs.len().saturating_sub(1);
        match (self.state, action) {
            (MatchingState::Navigating { focus }, InputAction::MoveUp) if focus > 0 => {
                self.move_focus(MatchingState::Navigating { focus: focus - 1 })
            }
            (MatchingState::Navigating { focus }, InputAction::MoveDown) => {
                if focus < last {
                    self.move_focus(MatchingState::Navigating { focus: focus + 1 })
                } else {
                    self.move_focus(MatchingState::SubmitFocused)
                }
            }
            (MatchingState::Navigating { focus }, InputAction::Select(i)) if i <= last && i != focus => {
                self.move_focus(MatchingState::Navigating { focus: i })
            }
            (MatchingState::Navigating { focus }, InputAction::Confirm) => {
                let right_focus = self.pairs.get(focus).copied().flatten().unwrap_or(0);
                self.move_focus(MatchingState::Picking { left: focus, right_focus })
            }
            (MatchingState::Picking { left, right_focus }, InputAction::MoveUp) if right_focus > 0 => {
                self.move_focus(MatchingState::Picking { left, right_focus: right_focus - 1 })
            }
            (MatchingState::Picking { left, right_focus }, InputAction::MoveDown) if right_focus < last => {
                self.move_focus(MatchingState::Picking { left, right_focus: right_focus + 1 })
            }
            (MatchingState::Picking { left, right_focus }, InputAction::Confirm) => self.assign(left, right_focus),
            (MatchingState::Picking { left, .. }, InputAction::Select(right)) if right <= last => {
                self.assign(left, right)
            }
            (MatchingState::Picking { left, .. }, InputAction::Cancel) => {
                self.move_focus(MatchingState::Navigating { focus: left })
            }
            (MatchingState::SubmitFocused, InputAction::MoveUp) => {
                self.move_focus(MatchingState::Navigating { focus: last })
            }
            (MatchingState::SubmitFocused, InputAction::Confirm) if self.submit_enabled() => {
                Step::submit(self.current_answer())
            }
            _ => Step::default(),
        }
    }

    fn move_focus(&mut self, state: MatchingState) -> Step {
        self.state = state;
        Step::event(RoundEvent::FocusMoved { focus: self.focus() })
    }

    fn assign(&mut self, left: usize, right: usize) -> Step {
        let taken_from = self
            .pairs
            .iter()
            .position(|p| *p == Some(right))
            .filter(|other| *other != left);
        if let Some(other) = taken_from {
            self.pairs[other] = None;
        }
        self.pairs[left] = Some(right);
        self.state = MatchingState::Navigating { focus: left };
        Step::event(RoundEvent::PairAssigned { left, right, taken_from })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_and_submit() {
        // 3×4 -> 12 (right 1), 7+8 -> 15 (right 0)
        let mut matching = MatchingInteraction::new(2);
        matching.handle(InputAction::Confirm);
        assert_eq!(matching.focus(), Focus::Right(0));
        matching.handle(InputAction::MoveDown);
        matching.handle(InputAction::Confirm);
        assert!(!matching.submit_enabled());

        matching.handle(InputAction::MoveDown);
        matching.handle(InputAction::Confirm);
        matching.handle(InputAction::Select(0));
        assert!(matching.submit_enabled());

        matching.handle(InputAction::MoveDown);
        assert_eq!(matching.state(), MatchingState::SubmitFocused);
        let step = matching.handle(InputAction::Confirm);
        assert_eq!(step.submission, Some(SubmittedAnswer::Matching(vec![Some(1), Some(0)])));
    }

    #[test]
    fn test_assign_takes_from_other_left() {
        let mut matching = MatchingInteraction::new(3);
        matching.handle(InputAction::Confirm);
        matching.handle(InputAction::Select(2));
        matching.handle(InputAction::MoveDown);
        matching.handle(InputAction::Confirm);
        let step = matching.handle(InputAction::Select(2));
        assert_eq!(
            step.events,
            vec![RoundEvent::PairAssigned { left: 1, right: 2, taken_from: Some(0) }]
        );
        assert_eq!(matching.pairs(), &[None, Some(2), None]);
    }

    #[test]
    fn test_submit_disabled_until_complete() {
        let mut matching = MatchingInteraction::new(2);
        matching.handle(InputAction::MoveDown);
        matching.handle(InputAction::MoveDown);
        assert_eq!(matching.focus(), Focus::Submit);
        assert!(matching.handle(InputAction::Confirm).submission.is_none());

        // Cancel while picking leaves pairs untouched
        matching.handle(InputAction::MoveUp);
        matching.handle(InputAction::Confirm);
        matching.handle(InputAction::Cancel);
        assert_eq!(matching.state(), MatchingState::Navigating { focus: 1 });
        assert_eq!(matching.current_answer(), SubmittedAnswer::Matching(vec![None, None]));
    }
}
