//! Error types for the engine.

use thiserror::Error;

use crate::subject::{DifficultyTier, Subject};

/// Errors surfaced by the session orchestrator
#[derive(Debug, Error)]
pub enum EngineError {
    /// The bank could not supply a full round even after static seeding
    #[error("not enough {subject} questions at {tier} to build a round")]
    InsufficientContent { subject: Subject, tier: DifficultyTier },

    #[error("a challenge round is already in progress")]
    RoundInProgress,

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode {document} document: {source}")]
    Encode {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors building a challenge round
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("a round needs at least one question")]
    Empty,

    #[error("question '{id}' is {found}, this round only takes {expected}")]
    ModalityMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors from a document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Errors from a question generator
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator does not support {0}")]
    UnsupportedSubject(Subject),

    #[error("generation failed: {0}")]
    Failed(String),
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
