//! Quest State Tracking
//!
//! Per-learner quest progress. Serialized as the quest document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::subject::{DifficultyTier, Subject};

pub const QUEST_DOC_VERSION: u32 = 1;

/// Status of a quest for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Prerequisites not met yet
    Locked,
    /// Can be accepted
    Available,
    /// Accepted, objectives outstanding
    Active,
    /// All objectives complete, ready to turn in
    ReadyToComplete,
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Locked => "locked",
            QuestStatus::Available => "available",
            QuestStatus::Active => "active",
            QuestStatus::ReadyToComplete => "ready_to_complete",
            QuestStatus::Completed => "completed",
        }
    }
}

/// Progress on a single objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub objective_id: String,
    pub current: u32,
    pub target: u32,
    pub completed: bool,
}

impl ObjectiveProgress {
    pub fn new(objective_id: &str, target: u32) -> Self {
        Self {
            objective_id: objective_id.to_string(),
            current: 0,
            target,
            completed: false,
        }
    }

    /// Add progress and return true if newly completed
    pub fn add_progress(&mut self, amount: u32) -> bool {
        if self.completed {
            return false;
        }
        self.current = self.current.saturating_add(amount).min(self.target);
        self.completed = self.current >= self.target;
        self.completed
    }

    /// Mark as complete regardless of count
    pub fn force_complete(&mut self) {
        self.current = self.target;
        self.completed = true;
    }

    pub fn progress_percent(&self) -> f32 {
        if self.target == 0 {
            return 1.0;
        }
        self.current as f32 / self.target as f32
    }
}

/// Progress on one active quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub quest_id: String,
    /// Progress on each objective (keyed by objective_id)
    pub objectives: BTreeMap<String, ObjectiveProgress>,
    pub started_at: Option<DateTime<Utc>>,
}

impl QuestProgress {
    pub fn new(quest_id: &str, objective_targets: &[(String, u32)]) -> Self {
        let objectives = objective_targets
            .iter()
            .map(|(id, target)| (id.clone(), ObjectiveProgress::new(id, *target)))
            .collect();

        Self {
            quest_id: quest_id.to_string(),
            objectives,
            started_at: Some(Utc::now()),
        }
    }

    /// Every objective has met its target
    pub fn is_ready(&self) -> bool {
        self.objectives.values().all(|o| o.completed)
    }
}

/// All quest state for one learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestRuntimeState {
    pub version: u32,
    /// Active quests (quest_id -> progress)
    #[serde(default)]
    pub active: BTreeMap<String, QuestProgress>,
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_flags: BTreeSet<String>,
    #[serde(default = "default_level")]
    pub player_level: u32,
    /// Best tier ever reached per subject
    #[serde(default)]
    pub highest_tier: BTreeMap<Subject, DifficultyTier>,
    /// History replay already ran for this profile
    #[serde(default)]
    pub migrated: bool,
}

fn default_level() -> u32 {
    1
}

impl Default for QuestRuntimeState {
    fn default() -> Self {
        Self {
            version: QUEST_DOC_VERSION,
            active: BTreeMap::new(),
            completed: BTreeSet::new(),
            unlocked_flags: BTreeSet::new(),
            player_level: default_level(),
            highest_tier: BTreeMap::new(),
            migrated: false,
        }
    }
}
