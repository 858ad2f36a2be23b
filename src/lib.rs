//! Adaptive learning engine: question bank, difficulty adaptation,
//! challenge rounds and quest tracking for one learner at a time.

pub mod bank;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod persistence;
pub mod quest;
pub mod question;
pub mod round;
pub mod session;
pub mod subject;
pub mod telemetry;

pub use config::EngineConfig;
pub use error::{EngineError, RoundError, StoreError};
pub use session::{LearnerSession, RoundOutcome};
pub use subject::{DifficultyTier, Subject};
