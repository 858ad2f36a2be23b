//! Ordering interaction
//!
//! The player's arrangement is a permutation of item indices, starting as
//! the display order. Grabbing an item and moving it swaps it with its
//! neighbour.

use super::events::RoundEvent;
use super::input::{Focus, InputAction};
use super::interaction::Step;
use crate::question::SubmittedAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingState {
    Navigating { focus: usize },
    Grabbed(usize),
    SubmitFocused,
}

#[derive(Debug, Clone)]
pub struct OrderingInteraction {
    arrangement: Vec<usize>,
    state: OrderingState,
    moved: bool,
}

impl OrderingInteraction {
    pub fn new(item_count: usize) -> Self {
        Self {
            arrangement: (0..item_count).collect(),
            state: OrderingState::Navigating { focus: 0 },
            moved: false,
        }
    }

    pub fn state(&self) -> OrderingState {
        self.state
    }

    pub fn arrangement(&self) -> &[usize] {
        &self.arrangement
    }

    pub fn focus(&self) -> Focus {
        match self.state {
            OrderingState::Navigating { focus } => Focus::Item(focus),
            OrderingState::Grabbed(i) => Focus::Item(i),
            OrderingState::SubmitFocused => Focus::Submit,
        }
    }

    /// Lit once the player has rearranged something
    pub fn submit_enabled(&self) -> bool {
        self.moved
    }

    pub fn current_answer(&self) -> SubmittedAnswer {
        SubmittedAnswer::Ordering(self.arrangement.clone())
    }

    pub fn handle(&mut self, action: InputAction) -> Step {
        let last = self.arrangement.len().saturating_sub(1);
        match (self.state, action) {
            (OrderingState::Navigating { focus }, InputAction::MoveUp) if focus > 0 => {
                self.move_focus(OrderingState::Navigating { focus: focus - 1 })
            }
            (OrderingState::Navigating { focus }, InputAction::MoveDown) => {
                if focus < last {
                    self.move_focus(OrderingState::Navigating { focus: focus + 1 })
                } else {
                    self.move_focus(OrderingState::SubmitFocused)
                }
            }
            (OrderingState::Navigating { focus }, InputAction::Select(i)) if i <= last && i != focus => {
                self.move_focus(OrderingState::Navigating { focus: i })
            }
            (OrderingState::Navigating { focus }, InputAction::Confirm) => {
                self.state = OrderingState::Grabbed(focus);
                Step::event(RoundEvent::ItemGrabbed { index: focus })
            }
            (OrderingState::Grabbed(i), InputAction::MoveUp) if i > 0 => self.swap(i, i - 1),
            (OrderingState::Grabbed(i), InputAction::MoveDown) if i < last => self.swap(i, i + 1),
            (OrderingState::Grabbed(i), InputAction::Confirm | InputAction::Cancel) => {
                self.state = OrderingState::Navigating { focus: i };
                Step::event(RoundEvent::ItemDropped { index: i })
            }
            (OrderingState::SubmitFocused, InputAction::MoveUp) => {
                self.move_focus(OrderingState::Navigating { focus: last })
            }
            (OrderingState::SubmitFocused, InputAction::Confirm) => Step::submit(self.current_answer()),
            _ => Step::default(),
        }
    }

    fn move_focus(&mut self, state: OrderingState) -> Step {
        self.state = state;
        Step::event(RoundEvent::FocusMoved { focus: self.focus() })
    }

    fn swap(&mut self, from: usize, to: usize) -> Step {
        self.arrangement.swap(from, to);
        self.state = OrderingState::Grabbed(to);
        self.moved = true;
        Step::event(RoundEvent::ItemsSwapped { from, to })
    }
}
