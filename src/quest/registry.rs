//! Quest Registry
//!
//! Loads and validates quest definitions from TOML files. Prerequisites
//! must name known quests and must not form a cycle.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::definition::{QuestDefinition, RawQuestFile};

/// Registry for all quest definitions
#[derive(Debug, Default)]
pub struct QuestRegistry {
    quests: BTreeMap<String, Arc<QuestDefinition>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-resolved definitions
    pub fn from_definitions(definitions: Vec<QuestDefinition>) -> Result<Self, String> {
        let mut registry = Self::new();
        for quest in definitions {
            registry.insert(quest)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Load every quest file under `dir`, recursively. Files that fail to
    /// parse are logged and skipped; a broken prerequisite graph is an error.
    pub fn load_from_directory(dir: &Path) -> Result<Self, String> {
        info!("Loading quests from {:?}", dir);
        let mut registry = Self::new();

        if !dir.exists() {
            warn!("Quest directory does not exist: {:?}", dir);
            return Ok(registry);
        }

        let mut paths = Vec::new();
        collect_toml_files(dir, &mut paths)?;
        paths.sort();

        for path in paths {
            if let Err(e) = registry.load_quest_file(&path) {
                warn!("Failed to load quest {:?}: {}", path, e);
            }
        }
        info!("Loaded {} quest definitions", registry.len());

        registry.validate()?;
        Ok(registry)
    }

    fn load_quest_file(&mut self, path: &Path) -> Result<(), String> {
        let content = std::fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let raw: RawQuestFile = toml::from_str(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        let quest = QuestDefinition::from_raw(&raw.quest)?;
        info!("Loaded quest: {} ({})", quest.name, quest.id);
        self.insert(quest)
    }

    fn insert(&mut self, quest: QuestDefinition) -> Result<(), String> {
        if self.quests.contains_key(&quest.id) {
            return Err(format!("Duplicate quest ID '{}'", quest.id));
        }
        self.quests.insert(quest.id.clone(), Arc::new(quest));
        Ok(())
    }

    /// Check prerequisite references and reject cycles
    pub fn validate(&self) -> Result<(), String> {
        fn visit(
            id: &str,
            quests: &BTreeMap<String, Arc<QuestDefinition>>,
            visited: &mut HashSet<String>,
            visiting: &mut HashSet<String>,
        ) -> Result<(), String> {
            if visited.contains(id) {
                return Ok(());
            }
            if visiting.contains(id) {
                return Err(format!("Circular quest prerequisites detected at '{}'", id));
            }

            visiting.insert(id.to_string());

            if let Some(quest) = quests.get(id) {
                for prereq in &quest.prerequisite_quests {
                    if !quests.contains_key(prereq) {
                        return Err(format!("Quest '{}' requires unknown quest '{}'", id, prereq));
                    }
                    visit(prereq, quests, visited, visiting)?;
                }
            }

            visiting.remove(id);
            visited.insert(id.to_string());
            Ok(())
        }

        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();
        for id in self.quests.keys() {
            visit(id, &self.quests, &mut visited, &mut visiting)?;
        }
        Ok(())
    }

    /// Get a quest by ID
    pub fn get(&self, quest_id: &str) -> Option<Arc<QuestDefinition>> {
        self.quests.get(quest_id).cloned()
    }

    /// All quest IDs, sorted
    pub fn all_ids(&self) -> Vec<String> {
        self.quests.keys().cloned().collect()
    }

    /// Quests given by a specific NPC
    pub fn quests_for_npc(&self, npc_id: &str) -> Vec<Arc<QuestDefinition>> {
        self.quests
            .values()
            .filter(|q| q.giver_npc == npc_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

/// Recursively collect `.toml` files
fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().map_or(false, |ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}
