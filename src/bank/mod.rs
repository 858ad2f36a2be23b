//! Question bank: per-learner question pool, usage tracking and
//! background replenishment.

pub mod banked;
pub mod replenish;
pub mod store;

pub use banked::{BankedQuestion, QuestionSource};
pub use replenish::{ArithmeticGenerator, GeneratedBatch, GenerationRequest, QuestionGenerator};
pub use store::{BANK_DOC_VERSION, QuestionBank, QuestionBankData};
