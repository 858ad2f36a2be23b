//! Question Definition Structures
//!
//! Raw structures are deserialized from catalog TOML files and resolved into
//! validated `Question` values. Generated content goes through the same
//! validation before it reaches a bank.

use serde::{Deserialize, Serialize};

use crate::subject::{DifficultyTier, Subject};

/// Catalog file as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogFile {
    #[serde(default, rename = "question")]
    pub questions: Vec<RawQuestion>,
}

/// Raw question data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub id: String,
    pub subject: String,
    pub tier: String,
    #[serde(default = "default_grade")]
    pub grade_level: u8,
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(rename = "type")]
    pub question_type: String,
    // multiple_choice
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_index: Option<usize>,
    // true_false
    #[serde(default)]
    pub answer: Option<bool>,
    // ordering
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub correct_order: Vec<usize>,
    // matching
    #[serde(default)]
    pub left: Vec<String>,
    #[serde(default)]
    pub right: Vec<String>,
    #[serde(default)]
    pub correct_mapping: Vec<usize>,
}

fn default_grade() -> u8 {
    1
}

// ============================================================================
// Resolved Question Structures
// ============================================================================

/// Answer shape of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerPayload {
    MultipleChoice {
        options: [String; 4],
        correct_index: usize,
    },
    TrueFalse {
        correct_answer: bool,
    },
    /// `items` are in display order; position `p` of the solved list holds
    /// `items[correct_order[p]]`
    Ordering {
        items: Vec<String>,
        correct_order: Vec<usize>,
    },
    /// Left item `i` pairs with right item `correct_mapping[i]`
    Matching {
        left_items: Vec<String>,
        right_items: Vec<String>,
        correct_mapping: Vec<usize>,
    },
}

/// Interaction modality, derived from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    MultipleChoice,
    TrueFalse,
    Ordering,
    Matching,
}

impl Modality {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "multiple_choice" | "mc" => Some(Modality::MultipleChoice),
            "true_false" | "tf" => Some(Modality::TrueFalse),
            "ordering" | "order" => Some(Modality::Ordering),
            "matching" | "match" => Some(Modality::Matching),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::MultipleChoice => "multiple_choice",
            Modality::TrueFalse => "true_false",
            Modality::Ordering => "ordering",
            Modality::Matching => "matching",
        }
    }
}

/// What the player handed in for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmittedAnswer {
    /// Chosen option index, `None` when the timer ran out first
    Choice(Option<usize>),
    TrueFalse(Option<bool>),
    /// Permutation of item indices, position by position
    Ordering(Vec<usize>),
    /// Right index chosen for each left item
    Matching(Vec<Option<usize>>),
}

/// Outcome of grading one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub correct: bool,
    /// One flag per option/position/pair; `true` marks a wrong part
    pub highlights: Vec<bool>,
}

/// A validated question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub payload: AnswerPayload,
    #[serde(default)]
    pub explanation: String,
    pub subject: Subject,
    pub tier: DifficultyTier,
    pub grade_level: u8,
}

fn is_permutation(order: &[usize], len: usize) -> bool {
    if order.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    for &i in order {
        if i >= len || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

impl AnswerPayload {
    pub fn modality(&self) -> Modality {
        match self {
            AnswerPayload::MultipleChoice { .. } => Modality::MultipleChoice,
            AnswerPayload::TrueFalse { .. } => Modality::TrueFalse,
            AnswerPayload::Ordering { .. } => Modality::Ordering,
            AnswerPayload::Matching { .. } => Modality::Matching,
        }
    }

    /// Check structural invariants of the payload
    pub fn validate(&self) -> Result<(), String> {
        match self {
            AnswerPayload::MultipleChoice { options, correct_index } => {
                if *correct_index >= options.len() {
                    return Err(format!("correct_index {} out of range", correct_index));
                }
                if options.iter().any(|o| o.trim().is_empty()) {
                    return Err("empty multiple-choice option".to_string());
                }
            }
            AnswerPayload::TrueFalse { .. } => {}
            AnswerPayload::Ordering { items, correct_order } => {
                if items.len() < 2 {
                    return Err("ordering needs at least two items".to_string());
                }
                if !is_permutation(correct_order, items.len()) {
                    return Err("correct_order is not a permutation of the items".to_string());
                }
            }
            AnswerPayload::Matching { left_items, right_items, correct_mapping } => {
                if left_items.len() < 2 {
                    return Err("matching needs at least two pairs".to_string());
                }
                if left_items.len() != right_items.len() {
                    return Err(format!(
                        "matching columns differ in length ({} vs {})",
                        left_items.len(),
                        right_items.len()
                    ));
                }
                if !is_permutation(correct_mapping, right_items.len()) {
                    return Err("correct_mapping is not a permutation of the right column".to_string());
                }
            }
        }
        Ok(())
    }

    /// Number of selectable options/items/left entries
    pub fn len(&self) -> usize {
        match self {
            AnswerPayload::MultipleChoice { options, .. } => options.len(),
            AnswerPayload::TrueFalse { .. } => 2,
            AnswerPayload::Ordering { items, .. } => items.len(),
            AnswerPayload::Matching { left_items, .. } => left_items.len(),
        }
    }

    /// Grade a submission. A submission of the wrong shape is simply wrong.
    pub fn grade(&self, answer: &SubmittedAnswer) -> Grade {
        match (self, answer) {
            (AnswerPayload::MultipleChoice { options, correct_index }, SubmittedAnswer::Choice(choice)) => {
                let correct = *choice == Some(*correct_index);
                let highlights = (0..options.len())
                    .map(|i| Some(i) == *choice && i != *correct_index)
                    .collect();
                Grade { correct, highlights }
            }
            (AnswerPayload::TrueFalse { correct_answer }, SubmittedAnswer::TrueFalse(choice)) => {
                let correct = *choice == Some(*correct_answer);
                // option 0 is "true", option 1 is "false"
                let highlights = [true, false]
                    .iter()
                    .map(|v| Some(*v) == *choice && *v != *correct_answer)
                    .collect();
                Grade { correct, highlights }
            }
            (AnswerPayload::Ordering { correct_order, .. }, SubmittedAnswer::Ordering(order)) => {
                let highlights: Vec<bool> = correct_order
                    .iter()
                    .enumerate()
                    .map(|(p, want)| order.get(p) != Some(want))
                    .collect();
                let correct = order.len() == correct_order.len() && !highlights.iter().any(|h| *h);
                Grade { correct, highlights }
            }
            (AnswerPayload::Matching { correct_mapping, .. }, SubmittedAnswer::Matching(mapping)) => {
                let highlights: Vec<bool> = correct_mapping
                    .iter()
                    .enumerate()
                    .map(|(i, want)| mapping.get(i).copied().flatten() != Some(*want))
                    .collect();
                let correct = mapping.len() == correct_mapping.len() && !highlights.iter().any(|h| *h);
                Grade { correct, highlights }
            }
            _ => Grade {
                correct: false,
                highlights: vec![true; self.len()],
            },
        }
    }

    /// Readable form of the right answer, for review screens
    pub fn correct_answer_text(&self) -> String {
        match self {
            AnswerPayload::MultipleChoice { options, correct_index } => options.get(*correct_index).cloned().unwrap_or_default(),
            AnswerPayload::TrueFalse { correct_answer } => {
                if *correct_answer { "True".to_string() } else { "False".to_string() }
            }
            AnswerPayload::Ordering { items, correct_order } => correct_order
                .iter()
                .map(|i| items.get(*i).map(String::as_str).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" → "),
            AnswerPayload::Matching { left_items, right_items, correct_mapping } => left_items
                .iter()
                .zip(correct_mapping)
                .map(|(l, r)| format!("{} = {}", l, right_items.get(*r).map(String::as_str).unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Question {
    /// Create a question from raw TOML data
    pub fn from_raw(raw: &RawQuestion) -> Result<Self, String> {
        let subject = Subject::from_str(&raw.subject)
            .ok_or_else(|| format!("Question '{}' has unknown subject '{}'", raw.id, raw.subject))?;
        let tier = DifficultyTier::from_str(&raw.tier)
            .ok_or_else(|| format!("Question '{}' has unknown tier '{}'", raw.id, raw.tier))?;
        let modality = Modality::from_str(&raw.question_type)
            .ok_or_else(|| format!("Question '{}' has unknown type '{}'", raw.id, raw.question_type))?;

        let payload = match modality {
            Modality::MultipleChoice => {
                let options: [String; 4] = raw.options.clone().try_into().map_err(|o: Vec<String>| {
                    format!("Question '{}' needs exactly 4 options, got {}", raw.id, o.len())
                })?;
                let correct_index = raw
                    .correct_index
                    .ok_or_else(|| format!("Question '{}' is missing correct_index", raw.id))?;
                AnswerPayload::MultipleChoice { options, correct_index }
            }
            Modality::TrueFalse => AnswerPayload::TrueFalse {
                correct_answer: raw
                    .answer
                    .ok_or_else(|| format!("Question '{}' is missing answer", raw.id))?,
            },
            Modality::Ordering => AnswerPayload::Ordering {
                items: raw.items.clone(),
                correct_order: raw.correct_order.clone(),
            },
            Modality::Matching => AnswerPayload::Matching {
                left_items: raw.left.clone(),
                right_items: raw.right.clone(),
                correct_mapping: raw.correct_mapping.clone(),
            },
        };

        let question = Self {
            id: raw.id.clone(),
            text: raw.text.clone(),
            payload,
            explanation: raw.explanation.clone(),
            subject,
            tier,
            grade_level: raw.grade_level,
        };
        question.validate()?;
        Ok(question)
    }

    /// Validate text and payload
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Question has an empty id".to_string());
        }
        if self.text.trim().is_empty() {
            return Err(format!("Question '{}' has empty text", self.id));
        }
        self.payload
            .validate()
            .map_err(|e| format!("Question '{}': {}", self.id, e))
    }

    pub fn modality(&self) -> Modality {
        self.payload.modality()
    }

    /// Text with whitespace collapsed and lowercased, used for duplicate detection
    pub fn normalized_text(&self) -> String {
        self.text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Hint derived from the correct answer. Never changes scoring.
    pub fn hint(&self) -> String {
        match &self.payload {
            AnswerPayload::MultipleChoice { options, correct_index } => {
                let wrong = options
                    .iter()
                    .enumerate()
                    .find(|(i, _)| i != correct_index)
                    .map(|(_, o)| o.as_str())
                    .unwrap_or_default();
                format!("It isn't \"{}\".", wrong)
            }
            AnswerPayload::TrueFalse { .. } => {
                let lead: Vec<&str> = self.text.split_whitespace().take(4).collect();
                format!("Read it again slowly: \"{}...\" Is every part of it right?", lead.join(" "))
            }
            AnswerPayload::Ordering { items, correct_order } => match correct_order.first().and_then(|i| items.get(*i)) {
                Some(first) => format!("\"{}\" comes first.", first),
                None => String::new(),
            },
            AnswerPayload::Matching { left_items, right_items, correct_mapping } => {
                match (left_items.first(), correct_mapping.first().and_then(|r| right_items.get(*r))) {
                    (Some(left), Some(right)) => {
                        format!("\"{}\" goes with \"{}\".", left, right)
                    }
                    _ => String::new(),
                }
            }
        }
    }
}
