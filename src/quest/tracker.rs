//! Quest Objective Tracker
//!
//! Applies gameplay events to a learner's quests. Acceptance is gated by
//! prerequisite quests and player level; completion hands out the reward
//! exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::definition::{ObjectiveKind, QuestDefinition, Reward};
use super::events::{QuestEvent, QuestEventResult};
use super::registry::QuestRegistry;
use super::state::{QuestProgress, QuestRuntimeState, QuestStatus};
use crate::subject::{DifficultyTier, Subject};

/// Aggregate counters from a save made before quests were tracked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressHistory {
    pub level: u32,
    pub challenges_completed: BTreeMap<Subject, u32>,
    pub tiers: BTreeMap<Subject, DifficultyTier>,
}

/// How an event advances a matching objective
enum Advance {
    By(u32),
    Complete,
}

pub struct QuestObjectiveTracker {
    registry: Arc<QuestRegistry>,
    state: QuestRuntimeState,
}

impl QuestObjectiveTracker {
    pub fn new(registry: Arc<QuestRegistry>) -> Self {
        Self::from_state(registry, QuestRuntimeState::default())
    }

    pub fn from_state(registry: Arc<QuestRegistry>, mut state: QuestRuntimeState) -> Self {
        state.active.retain(|id, _| {
            let known = registry.get(id).is_some();
            if !known {
                warn!(quest_id = %id, "Dropping progress for unknown quest");
            }
            known
        });
        let completed = state.completed.clone();
        state.active.retain(|id, _| !completed.contains(id));
        for progress in state.active.values_mut() {
            for objective in progress.objectives.values_mut() {
                if objective.current > objective.target {
                    warn!(quest_id = %progress.quest_id, objective_id = %objective.objective_id, "Clamping saved objective progress");
                    objective.current = objective.target;
                }
                objective.completed = objective.current >= objective.target;
            }
        }
        Self { registry, state }
    }

    pub fn state(&self) -> &QuestRuntimeState {
        &self.state
    }

    pub fn registry(&self) -> &Arc<QuestRegistry> {
        &self.registry
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_active(&self, quest_id: &str) -> bool {
        self.state.active.contains_key(quest_id)
    }

    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.state.completed.contains(quest_id)
    }

    /// Active with every objective met
    pub fn is_ready(&self, quest_id: &str) -> bool {
        self.state.active.get(quest_id).is_some_and(QuestProgress::is_ready)
    }

    pub fn progress(&self, quest_id: &str) -> Option<&QuestProgress> {
        self.state.active.get(quest_id)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.state.unlocked_flags.contains(flag)
    }

    pub fn player_level(&self) -> u32 {
        self.state.player_level
    }

    pub fn status(&self, quest_id: &str) -> QuestStatus {
        if self.is_completed(quest_id) {
            QuestStatus::Completed
        } else if self.is_ready(quest_id) {
            QuestStatus::ReadyToComplete
        } else if self.is_active(quest_id) {
            QuestStatus::Active
        } else if self.can_accept(quest_id) {
            QuestStatus::Available
        } else {
            QuestStatus::Locked
        }
    }

    /// Known, not started, prerequisites done and level high enough
    pub fn can_accept(&self, quest_id: &str) -> bool {
        let Some(quest) = self.registry.get(quest_id) else {
            return false;
        };
        if self.is_active(quest_id) || self.is_completed(quest_id) {
            return false;
        }
        if self.state.player_level < quest.prerequisite_level {
            return false;
        }
        quest.prerequisite_quests.iter().all(|p| self.is_completed(p))
    }

    pub fn quests_for_npc(&self, npc_id: &str) -> Vec<Arc<QuestDefinition>> {
        self.registry.quests_for_npc(npc_id)
    }

    pub fn npc_has_quest_to_give(&self, npc_id: &str) -> bool {
        self.quests_for_npc(npc_id).iter().any(|q| self.can_accept(&q.id))
    }

    pub fn npc_has_quest_to_complete(&self, npc_id: &str) -> bool {
        self.quests_for_npc(npc_id).iter().any(|q| self.is_ready(&q.id))
    }

    // ========================================================================
    // Accept / complete
    // ========================================================================

    /// Start a quest. Returns false (and changes nothing) unless it can be accepted.
    pub fn accept_quest(&mut self, quest_id: &str) -> bool {
        if !self.can_accept(quest_id) {
            debug!(quest_id, "Quest cannot be accepted");
            return false;
        }
        let Some(quest) = self.registry.get(quest_id) else {
            return false;
        };

        let targets: Vec<(String, u32)> = quest.objectives.iter().map(|o| (o.id.clone(), o.target())).collect();
        let mut progress = QuestProgress::new(quest_id, &targets);

        // Tiers reached before accepting still count
        for objective in &quest.objectives {
            if let ObjectiveKind::ReachDifficulty { subject, tier } = &objective.kind {
                if self.tier_reached(*subject, *tier) {
                    if let Some(p) = progress.objectives.get_mut(&objective.id) {
                        p.force_complete();
                    }
                }
            }
        }

        self.state.active.insert(quest_id.to_string(), progress);
        info!(quest_id, name = %quest.name, "Quest accepted");
        true
    }

    /// Turn in a ready quest. The reward is returned exactly once.
    pub fn complete_quest(&mut self, quest_id: &str) -> Option<Reward> {
        if self.is_completed(quest_id) {
            debug!(quest_id, "Quest already completed");
            return None;
        }
        if !self.is_ready(quest_id) {
            return None;
        }
        let quest = self.registry.get(quest_id)?;

        self.state.active.remove(quest_id);
        self.state.completed.insert(quest_id.to_string());
        if let Some(flag) = &quest.reward.unlock_flag {
            self.state.unlocked_flags.insert(flag.clone());
        }
        info!(quest_id, xp = quest.reward.xp, bond_points = quest.reward.bond_points, "Quest completed");
        Some(quest.reward.clone())
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn process_event(&mut self, event: &QuestEvent) -> Vec<QuestEventResult> {
        debug!(event = event.event_type(), "Processing quest event");
        match event {
            QuestEvent::NpcTalk { npc } => self.record_npc_talk(npc),
            QuestEvent::RoomVisit { room } => self.record_room_visit(room),
            QuestEvent::ChallengeComplete { subject } => self.record_challenge_complete(*subject),
            QuestEvent::DifficultyReached { subject, tier } => self.record_difficulty_reached(*subject, *tier),
            QuestEvent::LevelReached { level } => self.record_level_reached(*level),
        }
    }

    pub fn record_npc_talk(&mut self, npc_id: &str) -> Vec<QuestEventResult> {
        self.advance_objectives(|kind| match kind {
            ObjectiveKind::TalkTo { npc } if npc == npc_id => Some(Advance::Complete),
            _ => None,
        })
    }

    pub fn record_room_visit(&mut self, room_id: &str) -> Vec<QuestEventResult> {
        self.advance_objectives(|kind| match kind {
            ObjectiveKind::VisitRoom { room } if room == room_id => Some(Advance::Complete),
            _ => None,
        })
    }

    pub fn record_challenge_complete(&mut self, completed: Subject) -> Vec<QuestEventResult> {
        self.advance_objectives(|kind| match kind {
            ObjectiveKind::CompleteChallenges { subject, .. } if *subject == completed => Some(Advance::By(1)),
            _ => None,
        })
    }

    pub fn record_difficulty_reached(&mut self, reached_subject: Subject, reached: DifficultyTier) -> Vec<QuestEventResult> {
        let best = self.state.highest_tier.entry(reached_subject).or_default();
        if reached > *best {
            *best = reached;
        }
        self.advance_objectives(|kind| match kind {
            ObjectiveKind::ReachDifficulty { subject, tier } if *subject == reached_subject && reached >= *tier => {
                Some(Advance::Complete)
            }
            _ => None,
        })
    }

    /// Levels only gate acceptance; no objective tracks them directly
    pub fn record_level_reached(&mut self, level: u32) -> Vec<QuestEventResult> {
        if level > self.state.player_level {
            self.state.player_level = level;
            debug!(level, "Player level raised");
        }
        Vec::new()
    }

    fn tier_reached(&self, subject: Subject, tier: DifficultyTier) -> bool {
        self.state.highest_tier.get(&subject).is_some_and(|best| *best >= tier)
    }

    /// Apply `matcher` to every objective of every active quest
    fn advance_objectives(&mut self, matcher: impl Fn(&ObjectiveKind) -> Option<Advance>) -> Vec<QuestEventResult> {
        let mut results = Vec::new();

        for (quest_id, progress) in self.state.active.iter_mut() {
            let Some(quest) = self.registry.get(quest_id) else {
                continue;
            };
            let was_ready = progress.is_ready();

            for objective in &quest.objectives {
                let Some(advance) = matcher(&objective.kind) else {
                    continue;
                };
                let Some(obj) = progress.objectives.get_mut(&objective.id) else {
                    continue;
                };
                if obj.completed {
                    continue;
                }
                let newly_completed = match advance {
                    Advance::By(amount) => obj.add_progress(amount),
                    Advance::Complete => {
                        obj.force_complete();
                        true
                    }
                };
                let (current, target) = (obj.current, obj.target);

                let quest_ready = !was_ready && progress.is_ready();
                results.push(QuestEventResult {
                    quest_id: quest_id.clone(),
                    objective_id: objective.id.clone(),
                    new_progress: current,
                    target,
                    objective_completed: newly_completed,
                    quest_ready,
                });
            }
        }

        results
    }

    // ========================================================================
    // Migration
    // ========================================================================

    /// Rebuild quest state for a save that predates quest tracking, as if
    /// the recorded history had been played live. Runs at most once.
    pub fn replay_history(&mut self, history: &ProgressHistory) -> Vec<Reward> {
        if self.state.migrated {
            debug!("Quest history already replayed");
            return Vec::new();
        }

        self.record_level_reached(history.level);
        for (subject, tier) in &history.tiers {
            self.record_difficulty_reached(*subject, *tier);
        }

        let mut rewards = Vec::new();
        self.settle(&mut rewards);

        let mut remaining = history.challenges_completed.clone();
        while remaining.values().any(|n| *n > 0) {
            for (subject, left) in remaining.iter_mut() {
                if *left == 0 {
                    continue;
                }
                *left -= 1;
                self.record_challenge_complete(*subject);
                self.settle(&mut rewards);
            }
        }

        self.state.migrated = true;
        info!(
            completed = self.state.completed.len(),
            active = self.state.active.len(),
            rewards = rewards.len(),
            "Replayed quest history"
        );
        rewards
    }

    /// Complete every ready quest and accept every acceptable one until
    /// nothing changes
    fn settle(&mut self, rewards: &mut Vec<Reward>) {
        loop {
            let mut changed = false;
            for id in self.registry.all_ids() {
                if self.is_ready(&id) {
                    if let Some(reward) = self.complete_quest(&id) {
                        rewards.push(reward);
                        changed = true;
                    }
                } else if self.accept_quest(&id) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}
