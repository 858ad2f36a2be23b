//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files and resolved
//! into typed definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::subject::{DifficultyTier, Subject};

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub giver_npc: String,
    #[serde(default)]
    pub level_required: u32,
    /// Quests that must be completed first
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub rewards: Option<RawReward>,
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: String,
    #[serde(rename = "type")]
    pub objective_type: String,
    /// NPC id, room id or subject, depending on the type
    pub target: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Tier to reach, for `reach_difficulty`
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub description: String,
}

fn default_count() -> u32 {
    1
}

/// Raw reward as it appears in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReward {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub bond_points: u32,
    #[serde(default)]
    pub unlock_flag: Option<String>,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// What an objective asks of the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectiveKind {
    TalkTo { npc: String },
    VisitRoom { room: String },
    CompleteChallenges { subject: Subject, count: u32 },
    ReachDifficulty { subject: Subject, tier: DifficultyTier },
}

/// A resolved quest objective
#[derive(Debug, Clone, Serialize)]
pub struct Objective {
    pub id: String,
    pub kind: ObjectiveKind,
    pub description: String,
}

impl Objective {
    pub fn from_raw(raw: &RawObjective) -> Result<Self, String> {
        let subject = || {
            Subject::from_str(&raw.target)
                .ok_or_else(|| format!("Objective '{}' has unknown subject '{}'", raw.id, raw.target))
        };

        let kind = match raw.objective_type.to_lowercase().as_str() {
            "talk_to" | "talk" => ObjectiveKind::TalkTo {
                npc: raw.target.clone(),
            },
            "visit_room" | "visit" => ObjectiveKind::VisitRoom {
                room: raw.target.clone(),
            },
            "complete_challenges" | "challenges" => {
                if raw.count == 0 {
                    return Err(format!("Objective '{}' needs a count of at least 1", raw.id));
                }
                ObjectiveKind::CompleteChallenges {
                    subject: subject()?,
                    count: raw.count,
                }
            }
            "reach_difficulty" | "difficulty" => {
                let tier_name = raw
                    .tier
                    .as_deref()
                    .ok_or_else(|| format!("Objective '{}' is missing a tier", raw.id))?;
                let tier = DifficultyTier::from_str(tier_name)
                    .ok_or_else(|| format!("Objective '{}' has unknown tier '{}'", raw.id, tier_name))?;
                ObjectiveKind::ReachDifficulty {
                    subject: subject()?,
                    tier,
                }
            }
            other => return Err(format!("Invalid objective type '{}' on '{}'", other, raw.id)),
        };

        Ok(Self {
            id: raw.id.clone(),
            kind,
            description: raw.description.clone(),
        })
    }

    /// Progress needed to satisfy this objective
    pub fn target(&self) -> u32 {
        match &self.kind {
            ObjectiveKind::CompleteChallenges { count, .. } => *count,
            ObjectiveKind::TalkTo { .. } | ObjectiveKind::VisitRoom { .. } | ObjectiveKind::ReachDifficulty { .. } => 1,
        }
    }
}

/// Quest rewards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u32,
    pub bond_points: u32,
    pub unlock_flag: Option<String>,
}

impl Reward {
    pub fn from_raw(raw: &RawReward) -> Self {
        Self {
            xp: raw.xp,
            bond_points: raw.bond_points,
            unlock_flag: raw.unlock_flag.clone(),
        }
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// NPC that offers and receives this quest
    pub giver_npc: String,
    pub objectives: Vec<Objective>,
    pub reward: Reward,
    pub prerequisite_quests: Vec<String>,
    pub prerequisite_level: u32,
}

impl QuestDefinition {
    /// Create a quest from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        let objectives: Vec<Objective> = raw
            .objectives
            .iter()
            .map(Objective::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        if objectives.is_empty() {
            return Err(format!("Quest '{}' has no objectives", raw.id));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = objectives.iter().find(|o| !seen.insert(o.id.as_str())) {
            return Err(format!("Quest '{}' has duplicate objective '{}'", raw.id, dup.id));
        }

        Ok(Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            giver_npc: raw.giver_npc.clone(),
            objectives,
            reward: raw.rewards.as_ref().map(Reward::from_raw).unwrap_or_default(),
            prerequisite_quests: raw.prerequisites.clone(),
            prerequisite_level: raw.level_required,
        })
    }

    pub fn get_objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEST_TOML: &str = r#"
[quest]
id = "counting_club"
name = "Counting Club"
giver_npc = "owl"
level_required = 2
prerequisites = ["hello_owl"]

[[quest.objectives]]
id = "solve"
type = "complete_challenges"
target = "math"
count = 3

[[quest.objectives]]
id = "climb"
type = "reach_difficulty"
target = "math"
tier = "easy"

[quest.rewards]
xp = 40
bond_points = 2
unlock_flag = "library_door"
"#;

    #[test]
    fn test_parse_quest() {
        let raw: RawQuestFile = toml::from_str(QUEST_TOML).unwrap();
        let quest = QuestDefinition::from_raw(&raw.quest).unwrap();
        assert_eq!(quest.prerequisite_level, 2);
        assert_eq!(quest.prerequisite_quests, vec!["hello_owl".to_string()]);
        assert_eq!(
            quest.get_objective("solve").map(|o| o.kind.clone()),
            Some(ObjectiveKind::CompleteChallenges {
                subject: Subject::Math,
                count: 3
            })
        );
        assert_eq!(quest.get_objective("climb").map(Objective::target), Some(1));
        assert_eq!(quest.reward.unlock_flag.as_deref(), Some("library_door"));
    }

    #[test]
    fn test_objective_errors() {
        let raw = RawObjective {
            id: "x".into(),
            objective_type: "reach_difficulty".into(),
            target: "math".into(),
            count: 1,
            tier: None,
            description: String::new(),
        };
        assert!(Objective::from_raw(&raw).is_err());

        let raw = RawObjective {
            objective_type: "kill_monster".into(),
            ..raw
        };
        assert!(Objective::from_raw(&raw).is_err());

        let raw = RawObjective {
            objective_type: "complete_challenges".into(),
            target: "history".into(),
            ..raw
        };
        assert!(Objective::from_raw(&raw).is_err());
    }
}
