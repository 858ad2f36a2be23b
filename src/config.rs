//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the stock
//! tuning. `ENGINE_CONFIG_PATH` points `from_env` at a file.

use serde::Deserialize;
use std::path::Path;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::question::Modality;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub round: RoundConfig,
    pub bank: BankConfig,
    pub difficulty: DifficultyConfig,
}

/// Challenge round tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    pub round_size: usize,
    pub multiple_choice_secs: f32,
    pub true_false_secs: f32,
    pub ordering_secs: f32,
    pub matching_secs: f32,
    pub feedback_pause_secs: f32,
    pub correct_xp: u32,
    pub wrong_xp: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            round_size: 5,
            multiple_choice_secs: 30.0,
            true_false_secs: 20.0,
            ordering_secs: 45.0,
            matching_secs: 45.0,
            feedback_pause_secs: 1.2,
            correct_xp: 10,
            wrong_xp: 2,
        }
    }
}

impl RoundConfig {
    /// Countdown for one question of the given modality
    pub fn timer_for(&self, modality: Modality) -> f32 {
        match modality {
            Modality::MultipleChoice => self.multiple_choice_secs,
            Modality::TrueFalse => self.true_false_secs,
            Modality::Ordering => self.ordering_secs,
            Modality::Matching => self.matching_secs,
        }
    }
}

/// Question bank tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Fewer eligible candidates than this and a draw reports no content
    pub min_candidates: usize,
    /// Answers correct this many times mark a question mastered
    pub mastery_threshold: u32,
    pub recent_window: usize,
    pub target_supply: usize,
    pub batch_size: usize,
    pub replenish_cooldown_secs: i64,
    /// Days a mastered question stays after it was last shown
    pub mastered_grace_days: i64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            min_candidates: 5,
            mastery_threshold: 3,
            recent_window: 15,
            target_supply: 35,
            batch_size: 10,
            replenish_cooldown_secs: 300,
            mastered_grace_days: 7,
        }
    }
}

/// Difficulty adapter tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub window_size: usize,
    pub advance_accuracy: f32,
    pub regress_accuracy: f32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            advance_accuracy: 0.8,
            regress_accuracy: 0.4,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `ENGINE_CONFIG_PATH`, falling back to defaults on any error
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var("ENGINE_CONFIG_PATH") else {
            return Self::default();
        };
        match Self::load_from_path(Path::new(&path)) {
            Ok(config) => {
                info!(%path, "Loaded engine config (TOML)");
                config
            }
            Err(e) => {
                error!(%path, error = %e, "Failed to load engine config, using defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.round.round_size == 0 {
            return Err(ConfigError::Invalid("round.round_size must be at least 1".into()));
        }
        if self.difficulty.window_size == 0 {
            return Err(ConfigError::Invalid("difficulty.window_size must be at least 1".into()));
        }
        if self.difficulty.regress_accuracy >= self.difficulty.advance_accuracy {
            return Err(ConfigError::Invalid(
                "difficulty.regress_accuracy must be below advance_accuracy".into(),
            ));
        }
        if self.bank.mastery_threshold == 0 {
            return Err(ConfigError::Invalid("bank.mastery_threshold must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.round.round_size, 5);
        assert_eq!(config.round.timer_for(Modality::TrueFalse), 20.0);
        assert_eq!(config.bank.target_supply, 35);
        assert_eq!(config.difficulty.window_size, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [round]
            round_size = 3

            [bank]
            batch_size = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.round.round_size, 3);
        assert_eq!(config.round.correct_xp, 10);
        assert_eq!(config.bank.batch_size, 4);
        assert_eq!(config.bank.min_candidates, 5);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [difficulty]
            advance_accuracy = 0.3
            regress_accuracy = 0.5
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
