//! Question Module
//!
//! Question values, their answer payloads, and the bundled static catalog.

pub mod catalog;
pub mod definition;

pub use catalog::StaticCatalog;
pub use definition::{AnswerPayload, Grade, Modality, Question, RawCatalogFile, RawQuestion, SubmittedAnswer};
