//! Quest System Module
//!
//! TOML quest definitions with typed objectives, a prerequisite graph, and
//! per-learner progress tracking with history replay for older saves.

pub mod definition;
pub mod events;
pub mod registry;
pub mod state;
pub mod tracker;

pub use definition::{Objective, ObjectiveKind, QuestDefinition, Reward};
pub use events::{QuestEvent, QuestEventResult};
pub use registry::QuestRegistry;
pub use state::{ObjectiveProgress, QUEST_DOC_VERSION, QuestProgress, QuestRuntimeState, QuestStatus};
pub use tracker::{ProgressHistory, QuestObjectiveTracker};
