//! Player input for challenge rounds.

use serde::{Deserialize, Serialize};

/// Abstract input, already mapped from keys/touch by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    Confirm,
    Cancel,
    /// Pick an option or item directly, e.g. by tapping it
    Select(usize),
}

/// Where the cursor currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Focus {
    /// An option (choice), an item (ordering) or a left entry (matching)
    Item(usize),
    /// A right-column entry while picking a match
    Right(usize),
    Submit,
}

/// Abilities the player brings into a round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abilities {
    /// First wrong answer in the round gets one retry
    pub second_chance: bool,
    /// Show a hint at the start of every question
    pub hint: bool,
}
