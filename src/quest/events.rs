//! Quest Event Types
//!
//! Events that can trigger quest objective progress.

use serde::{Deserialize, Serialize};

use crate::subject::{DifficultyTier, Subject};

/// Events that can trigger quest progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestEvent {
    /// Player talked to an NPC
    NpcTalk { npc: String },
    /// Player entered a room
    RoomVisit { room: String },
    /// Player passed a challenge round in a subject
    ChallengeComplete { subject: Subject },
    /// The difficulty adapter moved a subject to a new tier
    DifficultyReached { subject: Subject, tier: DifficultyTier },
    LevelReached { level: u32 },
}

impl QuestEvent {
    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            QuestEvent::NpcTalk { .. } => "npc_talk",
            QuestEvent::RoomVisit { .. } => "room_visit",
            QuestEvent::ChallengeComplete { .. } => "challenge_complete",
            QuestEvent::DifficultyReached { .. } => "difficulty_reached",
            QuestEvent::LevelReached { .. } => "level_reached",
        }
    }
}

/// Result of processing a quest event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestEventResult {
    /// Quest ID that was affected
    pub quest_id: String,
    /// Objective ID that was updated
    pub objective_id: String,
    pub new_progress: u32,
    pub target: u32,
    /// Whether the objective was just completed
    pub objective_completed: bool,
    /// Whether the entire quest is now ready to complete
    pub quest_ready: bool,
}
