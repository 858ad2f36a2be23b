//! Question Generation
//!
//! The contract any content pipeline (AI or otherwise) satisfies to feed a
//! bank, plus a procedural arithmetic generator that needs no network.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::question::{AnswerPayload, Question};
use crate::subject::{DifficultyTier, Subject};

/// What a bank asks a generator for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub subject: Subject,
    pub tier: DifficultyTier,
    pub grade_level: u8,
    pub count: usize,
}

/// Supplies new questions for a bank. Runs on a blocking worker thread, so
/// implementations may do slow I/O. Returned questions must validate;
/// anything that doesn't is dropped by the bank.
pub trait QuestionGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError>;
}

/// A delivered (or failed) generation for one subject
#[derive(Debug)]
pub struct GeneratedBatch {
    pub subject: Subject,
    pub result: Result<Vec<Question>, String>,
}

// ============================================================================
// Arithmetic generator
// ============================================================================

const MAX_DISTINCT_ATTEMPTS: usize = 50;

/// Procedural math questions in every modality, scaled by tier
pub struct ArithmeticGenerator {
    seed: u64,
    calls: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "×",
            Op::Div => "÷",
        }
    }
}

impl ArithmeticGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().r#gen())
    }

    /// Deterministic output for a given seed and call sequence
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            calls: AtomicU64::new(0),
        }
    }

    fn ops_for(tier: DifficultyTier) -> &'static [Op] {
        match tier {
            DifficultyTier::Beginner => &[Op::Add, Op::Sub],
            DifficultyTier::Easy => &[Op::Add, Op::Sub, Op::Mul],
            DifficultyTier::Medium => &[Op::Add, Op::Sub, Op::Mul],
            DifficultyTier::Hard | DifficultyTier::Advanced => &[Op::Add, Op::Sub, Op::Mul, Op::Div],
        }
    }

    /// (operand limit for +/-, factor limit for ×/÷)
    fn limits_for(tier: DifficultyTier) -> (i64, i64) {
        match tier {
            DifficultyTier::Beginner => (10, 1),
            DifficultyTier::Easy => (20, 5),
            DifficultyTier::Medium => (100, 10),
            DifficultyTier::Hard => (500, 12),
            DifficultyTier::Advanced => (1000, 25),
        }
    }

    fn expression(tier: DifficultyTier, rng: &mut StdRng) -> (String, i64) {
        let (sum_limit, factor_limit) = Self::limits_for(tier);
        let op = *Self::ops_for(tier).choose(rng).unwrap_or(&Op::Add);
        let (a, b, value) = match op {
            Op::Add => {
                let a = rng.gen_range(0..=sum_limit / 2);
                let b = rng.gen_range(0..=sum_limit / 2);
                (a, b, a + b)
            }
            Op::Sub => {
                let a = rng.gen_range(1..=sum_limit);
                let b = rng.gen_range(0..=a);
                (a, b, a - b)
            }
            Op::Mul => {
                let a = rng.gen_range(1..=factor_limit);
                let b = rng.gen_range(1..=factor_limit);
                (a, b, a * b)
            }
            Op::Div => {
                let b = rng.gen_range(2..=factor_limit);
                let value = rng.gen_range(1..=factor_limit);
                (b * value, b, value)
            }
        };
        (format!("{} {} {}", a, op.symbol(), b), value)
    }

    /// `n` expressions with pairwise distinct values
    fn distinct_expressions(tier: DifficultyTier, n: usize, rng: &mut StdRng) -> Option<Vec<(String, i64)>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(n);
        for _ in 0..MAX_DISTINCT_ATTEMPTS {
            let (text, value) = Self::expression(tier, rng);
            if seen.insert(value) {
                out.push((text, value));
                if out.len() == n {
                    return Some(out);
                }
            }
        }
        None
    }

    fn multiple_choice(request: &GenerationRequest, rng: &mut StdRng) -> Question {
        let (text, value) = Self::expression(request.tier, rng);
        let mut options = vec![value];
        for delta in [1, -1, 2, 10, -2, 3, 5] {
            if options.len() == 4 {
                break;
            }
            let candidate = value + delta;
            if candidate >= 0 && !options.contains(&candidate) {
                options.push(candidate);
            }
        }
        options.shuffle(rng);
        let correct_index = options.iter().position(|o| *o == value).unwrap_or(0);
        let options = [0, 1, 2, 3].map(|i| options[i].to_string());
        Self::build(
            request,
            format!("What is {}?", text),
            AnswerPayload::MultipleChoice { options, correct_index },
            format!("{} = {}.", text, value),
        )
    }

    fn true_false(request: &GenerationRequest, rng: &mut StdRng) -> Question {
        let (text, value) = Self::expression(request.tier, rng);
        let correct_answer = rng.gen_bool(0.5);
        let shown = if correct_answer {
            value
        } else {
            value + *[1, 2, 10].choose(rng).unwrap_or(&1)
        };
        Self::build(
            request,
            format!("{} = {}", text, shown),
            AnswerPayload::TrueFalse { correct_answer },
            format!("{} = {}.", text, value),
        )
    }

    fn ordering(request: &GenerationRequest, rng: &mut StdRng) -> Option<Question> {
        let exprs = Self::distinct_expressions(request.tier, 4, rng)?;
        let mut correct_order: Vec<usize> = (0..exprs.len()).collect();
        correct_order.sort_by_key(|i| exprs[*i].1);
        let explanation = correct_order
            .iter()
            .map(|i| format!("{} = {}", exprs[*i].0, exprs[*i].1))
            .collect::<Vec<_>>()
            .join(", ");
        Some(Self::build(
            request,
            "Put the answers in order from smallest to biggest.".to_string(),
            AnswerPayload::Ordering {
                items: exprs.into_iter().map(|(t, _)| t).collect(),
                correct_order,
            },
            explanation,
        ))
    }

    fn matching(request: &GenerationRequest, rng: &mut StdRng) -> Option<Question> {
        let exprs = Self::distinct_expressions(request.tier, 3, rng)?;
        let mut right: Vec<usize> = (0..exprs.len()).collect();
        right.shuffle(rng);
        // right[r] is the expression whose answer sits at right-column slot r
        let mut correct_mapping = vec![0; exprs.len()];
        for (slot, expr) in right.iter().enumerate() {
            correct_mapping[*expr] = slot;
        }
        let explanation = exprs
            .iter()
            .map(|(t, v)| format!("{} = {}", t, v))
            .collect::<Vec<_>>()
            .join(", ");
        Some(Self::build(
            request,
            "Match each problem to its answer.".to_string(),
            AnswerPayload::Matching {
                left_items: exprs.iter().map(|(t, _)| t.clone()).collect(),
                right_items: right.iter().map(|i| exprs[*i].1.to_string()).collect(),
                correct_mapping,
            },
            explanation,
        ))
    }

    fn build(request: &GenerationRequest, text: String, payload: AnswerPayload, explanation: String) -> Question {
        Question {
            id: format!("gen-{}", Uuid::new_v4()),
            text,
            payload,
            explanation,
            subject: request.subject,
            tier: request.tier,
            grade_level: request.grade_level,
        }
    }
}

impl Default for ArithmeticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionGenerator for ArithmeticGenerator {
    fn name(&self) -> &str {
        "arithmetic"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
        if request.subject != Subject::Math {
            return Err(GenerationError::UnsupportedSubject(request.subject));
        }

        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(call.wrapping_mul(0x9E37_79B9_7F4A_7C15)));

        let mut questions = Vec::with_capacity(request.count);
        for i in 0..request.count {
            // Mostly multiple choice, with every other shape mixed in
            let question = match i % 6 {
                2 => Some(Self::true_false(request, &mut rng)),
                3 => Self::ordering(request, &mut rng),
                5 => Self::matching(request, &mut rng),
                _ => None,
            };
            questions.push(question.unwrap_or_else(|| Self::multiple_choice(request, &mut rng)));
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Modality, SubmittedAnswer};

    fn request(tier: DifficultyTier, count: usize) -> GenerationRequest {
        GenerationRequest {
            subject: Subject::Math,
            tier,
            grade_level: 2,
            count,
        }
    }

    #[test]
    fn test_generated_questions_validate() {
        let generator = ArithmeticGenerator::with_seed(7);
        for tier in DifficultyTier::ALL {
            let questions = generator.generate(&request(tier, 12)).unwrap();
            assert_eq!(questions.len(), 12);
            for q in &questions {
                q.validate().unwrap();
                assert_eq!(q.tier, tier);
            }
            let shapes: HashSet<Modality> = questions.iter().map(|q| q.modality()).collect();
            assert!(shapes.contains(&Modality::MultipleChoice));
            assert!(shapes.contains(&Modality::TrueFalse));
        }
    }

    #[test]
    fn test_generated_answers_are_consistent() {
        let generator = ArithmeticGenerator::with_seed(11);
        let questions = generator.generate(&request(DifficultyTier::Medium, 6)).unwrap();
        for q in questions {
            if let AnswerPayload::Ordering { correct_order, .. } = &q.payload {
                assert!(q.payload.grade(&SubmittedAnswer::Ordering(correct_order.clone())).correct);
            }
            if let AnswerPayload::Matching { correct_mapping, .. } = &q.payload {
                let mapping = correct_mapping.iter().map(|r| Some(*r)).collect();
                assert!(q.payload.grade(&SubmittedAnswer::Matching(mapping)).correct);
            }
        }
    }

    #[test]
    fn test_unsupported_subject() {
        let generator = ArithmeticGenerator::with_seed(1);
        let mut req = request(DifficultyTier::Easy, 3);
        req.subject = Subject::Reading;
        assert!(matches!(
            generator.generate(&req),
            Err(GenerationError::UnsupportedSubject(Subject::Reading))
        ));
    }
}
