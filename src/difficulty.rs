//! Difficulty Adapter
//!
//! Rolling-window accuracy tracking per subject:
//! - Nothing is decided until the window holds `window_size` outcomes
//! - Once primed, every new outcome re-evaluates the window
//! - A tier change clears the window; anything else lets it keep sliding

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

use crate::config::DifficultyConfig;
use crate::subject::{DifficultyTier, Subject};

pub const DIFFICULTY_DOC_VERSION: u32 = 1;

/// Lifetime totals, kept apart from the window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCounters {
    pub completed: u32,
    pub correct: u32,
}

impl LifetimeCounters {
    pub fn accuracy(&self) -> f32 {
        if self.completed == 0 {
            return 0.0;
        }
        self.correct as f32 / self.completed as f32
    }
}

/// Persisted adapter state for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyState {
    pub version: u32,
    #[serde(default)]
    pub tiers: BTreeMap<Subject, DifficultyTier>,
    #[serde(default)]
    pub windows: BTreeMap<Subject, VecDeque<bool>>,
    #[serde(default)]
    pub lifetime: BTreeMap<Subject, LifetimeCounters>,
}

impl Default for DifficultyState {
    fn default() -> Self {
        Self {
            version: DIFFICULTY_DOC_VERSION,
            tiers: BTreeMap::new(),
            windows: BTreeMap::new(),
            lifetime: BTreeMap::new(),
        }
    }
}

/// Adapts per-subject tiers from recent outcomes
#[derive(Debug, Clone)]
pub struct DifficultyAdapter {
    config: DifficultyConfig,
    state: DifficultyState,
}

impl DifficultyAdapter {
    pub fn new(config: DifficultyConfig) -> Self {
        Self::from_state(config, DifficultyState::default())
    }

    pub fn from_state(config: DifficultyConfig, mut state: DifficultyState) -> Self {
        // A window longer than the configured size can only come from an
        // older config; keep the newest outcomes.
        for window in state.windows.values_mut() {
            while window.len() > config.window_size {
                window.pop_front();
            }
        }
        Self { config, state }
    }

    /// Record one outcome. Returns true if the subject's tier changed.
    pub fn record_result(&mut self, subject: Subject, is_correct: bool) -> bool {
        let counters = self.state.lifetime.entry(subject).or_default();
        counters.completed += 1;
        if is_correct {
            counters.correct += 1;
        }

        let window_size = self.config.window_size;
        let window = self.state.windows.entry(subject).or_default();
        window.push_back(is_correct);
        while window.len() > window_size {
            window.pop_front();
        }

        if window.len() < window_size {
            return false;
        }

        let correct = window.iter().filter(|c| **c).count();
        let accuracy = correct as f32 / window_size as f32;
        let current = self.tier(subject);

        let proposed = if accuracy >= self.config.advance_accuracy {
            current.next()
        } else if accuracy <= self.config.regress_accuracy {
            current.previous()
        } else {
            None
        };

        match proposed {
            Some(new_tier) => {
                self.state.tiers.insert(subject, new_tier);
                if let Some(window) = self.state.windows.get_mut(&subject) {
                    window.clear();
                }
                info!(%subject, from = %current, to = %new_tier, accuracy, "Difficulty tier changed");
                true
            }
            None => {
                debug!(%subject, tier = %current, accuracy, "Window evaluated, tier unchanged");
                false
            }
        }
    }

    /// Fold `record_result` over the outcomes. Returns true if any call
    /// changed the tier.
    pub fn record_results(&mut self, subject: Subject, outcomes: &[bool]) -> bool {
        outcomes
            .iter()
            .fold(false, |changed, outcome| self.record_result(subject, *outcome) || changed)
    }

    pub fn tier(&self, subject: Subject) -> DifficultyTier {
        self.state.tiers.get(&subject).copied().unwrap_or_default()
    }

    pub fn set_tier(&mut self, subject: Subject, tier: DifficultyTier) {
        self.state.tiers.insert(subject, tier);
    }

    pub fn window_len(&self, subject: Subject) -> usize {
        self.state.windows.get(&subject).map_or(0, VecDeque::len)
    }

    pub fn lifetime(&self, subject: Subject) -> LifetimeCounters {
        self.state.lifetime.get(&subject).copied().unwrap_or_default()
    }

    pub fn lifetime_accuracy(&self, subject: Subject) -> f32 {
        self.lifetime(subject).accuracy()
    }

    /// Override lifetime counters, e.g. from an older save
    pub fn restore_counters(&mut self, subject: Subject, completed: u32, correct: u32) {
        self.state.lifetime.insert(
            subject,
            LifetimeCounters {
                completed,
                correct: correct.min(completed),
            },
        );
    }

    pub fn state(&self) -> &DifficultyState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> DifficultyAdapter {
        DifficultyAdapter::new(DifficultyConfig::default())
    }

    #[test]
    fn test_no_decision_before_window_full() {
        let mut adapter = adapter();
        for _ in 0..9 {
            assert!(!adapter.record_result(Subject::Math, true));
        }
        assert_eq!(adapter.tier(Subject::Math), DifficultyTier::Beginner);
        assert_eq!(adapter.window_len(Subject::Math), 9);
    }

    #[test]
    fn test_advance_clears_window() {
        let mut adapter = adapter();
        let outcomes = [true, true, false, true, true, true, true, false, true, true];
        let changed = adapter.record_results(Subject::Math, &outcomes);
        assert!(changed);
        assert_eq!(adapter.tier(Subject::Math), DifficultyTier::Easy);
        assert_eq!(adapter.window_len(Subject::Math), 0);

        // An 11th outcome starts a fresh window
        assert!(!adapter.record_result(Subject::Math, true));
        assert_eq!(adapter.window_len(Subject::Math), 1);
    }

    #[test]
    fn test_regress_and_floor() {
        let mut adapter = adapter();
        adapter.set_tier(Subject::Reading, DifficultyTier::Medium);
        let outcomes = [true, false, false, true, false, true, false, false, true, false];
        assert!(adapter.record_results(Subject::Reading, &outcomes));
        assert_eq!(adapter.tier(Subject::Reading), DifficultyTier::Easy);

        assert!(adapter.record_results(Subject::Reading, &[false; 10]));
        assert_eq!(adapter.tier(Subject::Reading), DifficultyTier::Beginner);

        // Already at the floor: no change and the window keeps sliding
        assert!(!adapter.record_results(Subject::Reading, &[false; 10]));
        assert_eq!(adapter.tier(Subject::Reading), DifficultyTier::Beginner);
        assert_eq!(adapter.window_len(Subject::Reading), 10);
    }

    #[test]
    fn test_ceiling_is_clamped() {
        let mut adapter = adapter();
        adapter.set_tier(Subject::Science, DifficultyTier::Advanced);
        assert!(!adapter.record_results(Subject::Science, &[true; 10]));
        assert_eq!(adapter.tier(Subject::Science), DifficultyTier::Advanced);
    }

    #[test]
    fn test_middle_accuracy_slides_window() {
        let mut adapter = adapter();
        // 6/10 correct: no decision, window stays primed
        let outcomes = [true, true, true, true, true, true, false, false, false, false];
        assert!(!adapter.record_results(Subject::Math, &outcomes));
        assert_eq!(adapter.window_len(Subject::Math), 10);

        // Two more correct: window is now [T,T,T,T,F,F,F,F,T,T] = 6/10
        assert!(!adapter.record_results(Subject::Math, &[true, true]));
        // Two more correct: [T,T,F,F,F,F,T,T,T,T] = 6/10
        assert!(!adapter.record_results(Subject::Math, &[true, true]));
        // The fourth of these pushes out enough misses to reach 8/10
        assert!(adapter.record_results(Subject::Math, &[true, true, true, true]));
        assert_eq!(adapter.tier(Subject::Math), DifficultyTier::Easy);
    }

    #[test]
    fn test_lifetime_counters_always_update() {
        let mut adapter = adapter();
        adapter.record_results(Subject::Math, &[true, false, true]);
        let counters = adapter.lifetime(Subject::Math);
        assert_eq!(counters.completed, 3);
        assert_eq!(counters.correct, 2);
        assert!((adapter.lifetime_accuracy(Subject::Math) - 2.0 / 3.0).abs() < 1e-6);

        adapter.restore_counters(Subject::Math, 40, 30);
        assert_eq!(adapter.lifetime(Subject::Math).completed, 40);
    }

    #[test]
    fn test_state_round_trip() {
        let mut adapter = adapter();
        adapter.record_results(Subject::Science, &[true; 10]);
        adapter.record_results(Subject::Science, &[false, true]);

        let json = serde_json::to_string(adapter.state()).unwrap();
        let state: DifficultyState = serde_json::from_str(&json).unwrap();
        let restored = DifficultyAdapter::from_state(DifficultyConfig::default(), state);
        assert_eq!(restored.tier(Subject::Science), DifficultyTier::Easy);
        assert_eq!(restored.window_len(Subject::Science), 2);
        assert_eq!(restored.lifetime(Subject::Science).completed, 12);
    }
}
