//! Question Bank
//!
//! Per-learner pool of questions with usage history. Draws rank candidates
//! so unmastered and unseen questions come first; background generation
//! keeps the unmastered supply topped up.

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::banked::{BankedQuestion, QuestionSource};
use super::replenish::{GeneratedBatch, GenerationRequest, QuestionGenerator};
use crate::config::BankConfig;
use crate::question::{Modality, Question, StaticCatalog};
use crate::subject::{DifficultyTier, Subject};

pub const BANK_DOC_VERSION: u32 = 1;

/// Quiz accuracy at or above this asks the generator for harder content
const STEER_UP_ACCURACY: f32 = 0.8;
/// Quiz accuracy at or below this asks for easier content
const STEER_DOWN_ACCURACY: f32 = 0.4;

/// Persisted bank document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBankData {
    pub version: u32,
    #[serde(default)]
    pub subjects: BTreeMap<Subject, Vec<BankedQuestion>>,
    #[serde(default)]
    pub last_replenished: BTreeMap<Subject, DateTime<Utc>>,
    /// Newest first
    #[serde(default)]
    pub recently_shown: BTreeMap<Subject, VecDeque<String>>,
}

impl Default for QuestionBankData {
    fn default() -> Self {
        Self {
            version: BANK_DOC_VERSION,
            subjects: BTreeMap::new(),
            last_replenished: BTreeMap::new(),
            recently_shown: BTreeMap::new(),
        }
    }
}

pub struct QuestionBank {
    config: BankConfig,
    data: QuestionBankData,
    catalog: Arc<StaticCatalog>,
    generator: Option<Arc<dyn QuestionGenerator>>,
    runtime: Option<Handle>,
    generated_tx: mpsc::UnboundedSender<GeneratedBatch>,
    generated_rx: mpsc::UnboundedReceiver<GeneratedBatch>,
    in_flight: HashSet<Subject>,
    rng: StdRng,
}

impl QuestionBank {
    pub fn new(config: BankConfig, catalog: Arc<StaticCatalog>) -> Self {
        Self::from_data(config, catalog, QuestionBankData::default())
    }

    /// Build from a loaded document. Questions whose payload no longer
    /// validates are dropped so nothing downstream indexes past their items.
    pub fn from_data(config: BankConfig, catalog: Arc<StaticCatalog>, mut data: QuestionBankData) -> Self {
        for (subject, bank) in data.subjects.iter_mut() {
            bank.retain(|banked| match banked.question.validate() {
                Ok(()) => true,
                Err(e) => {
                    error!(%subject, error = %e, "Dropping invalid question from saved bank");
                    false
                }
            });
        }
        for ring in data.recently_shown.values_mut() {
            ring.truncate(config.recent_window);
        }
        let (generated_tx, generated_rx) = mpsc::unbounded_channel();
        Self {
            config,
            data,
            catalog,
            generator: None,
            runtime: None,
            generated_tx,
            generated_rx,
            in_flight: HashSet::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Enable background replenishment
    pub fn with_generator(mut self, generator: Arc<dyn QuestionGenerator>, runtime: Handle) -> Self {
        self.generator = Some(generator);
        self.runtime = Some(runtime);
        self
    }

    /// Fix the tie-break shuffle, for reproducible draws
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn data(&self) -> &QuestionBankData {
        &self.data
    }

    pub fn count(&self, subject: Subject) -> usize {
        self.data.subjects.get(&subject).map_or(0, Vec::len)
    }

    pub fn mastered_count(&self, subject: Subject) -> usize {
        let threshold = self.config.mastery_threshold;
        self.questions(subject)
            .iter()
            .filter(|b| b.is_mastered(threshold))
            .count()
    }

    /// Unmastered questions not shown recently
    pub fn supply(&self, subject: Subject) -> usize {
        let threshold = self.config.mastery_threshold;
        let recent = self.data.recently_shown.get(&subject);
        self.questions(subject)
            .iter()
            .filter(|b| !b.is_mastered(threshold))
            .filter(|b| !recent.is_some_and(|r| r.iter().any(|id| id == b.id())))
            .count()
    }

    pub fn get(&self, id: &str) -> Option<&BankedQuestion> {
        self.data.subjects.values().flatten().find(|b| b.id() == id)
    }

    pub fn is_replenishing(&self, subject: Subject) -> bool {
        self.in_flight.contains(&subject)
    }

    fn questions(&self, subject: Subject) -> &[BankedQuestion] {
        self.data.subjects.get(&subject).map(Vec::as_slice).unwrap_or(&[])
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Multiple-choice questions for a standard round
    pub fn draw(&mut self, subject: Subject, tier: DifficultyTier, count: usize, grade_level: u8) -> Option<Vec<Question>> {
        self.draw_modality(subject, tier, Modality::MultipleChoice, count, grade_level)
    }

    /// Questions of one payload shape
    pub fn draw_modality(
        &mut self,
        subject: Subject,
        tier: DifficultyTier,
        modality: Modality,
        count: usize,
        grade_level: u8,
    ) -> Option<Vec<Question>> {
        self.absorb_generated();
        let candidates = self.ranked_candidates(subject, tier, |q| q.modality() == modality);
        if candidates.len() < self.required(count) {
            debug!(
                %subject, %tier, modality = modality.as_str(), eligible = candidates.len(), grade_level,
                "Not enough eligible questions to draw"
            );
            return None;
        }
        Some(candidates.into_iter().take(count).collect())
    }

    /// Heterogeneous round: about half non-multiple-choice, order shuffled.
    /// Falls back to the plain draw when fewer than two other shapes exist.
    pub fn draw_mixed(&mut self, subject: Subject, tier: DifficultyTier, count: usize, grade_level: u8) -> Option<Vec<Question>> {
        self.absorb_generated();
        let candidates = self.ranked_candidates(subject, tier, |_| true);
        let (mut others, mut choices): (VecDeque<Question>, VecDeque<Question>) = candidates
            .into_iter()
            .partition(|q| q.modality() != Modality::MultipleChoice);

        if others.len() < 2 {
            debug!(%subject, %tier, others = others.len(), "Too few non-choice questions, using plain draw");
            return self.draw(subject, tier, count, grade_level);
        }
        if others.len() + choices.len() < self.required(count) {
            debug!(%subject, %tier, grade_level, "Not enough eligible questions for a mixed draw");
            return None;
        }

        let mut picked = Vec::with_capacity(count);
        let wanted_others = count.div_ceil(2);
        while picked.len() < wanted_others {
            match others.pop_front() {
                Some(q) => picked.push(q),
                None => break,
            }
        }
        while picked.len() < count {
            match choices.pop_front().or_else(|| others.pop_front()) {
                Some(q) => picked.push(q),
                None => break,
            }
        }
        picked.shuffle(&mut self.rng);
        Some(picked)
    }

    fn required(&self, count: usize) -> usize {
        self.config.min_candidates.max(count)
    }

    /// Eligible questions, best first
    fn ranked_candidates(&mut self, subject: Subject, tier: DifficultyTier, filter: impl Fn(&Question) -> bool) -> Vec<Question> {
        let threshold = self.config.mastery_threshold;
        let recent = self.data.recently_shown.get(&subject);
        let mut ranked: Vec<(bool, bool, Question)> = self
            .data
            .subjects
            .get(&subject)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|b| b.question.tier == tier && filter(&b.question))
            .filter_map(|b| {
                let mastered = b.is_mastered(threshold);
                let is_recent = recent.is_some_and(|r| r.iter().any(|id| id == b.id()));
                if mastered && is_recent {
                    return None;
                }
                Some((mastered, is_recent, b.question.clone()))
            })
            .collect();

        ranked.shuffle(&mut self.rng);
        ranked.sort_by_key(|(mastered, is_recent, _)| (*mastered, *is_recent));
        ranked.into_iter().map(|(_, _, q)| q).collect()
    }

    // ========================================================================
    // Usage tracking
    // ========================================================================

    /// Record the outcome of each shown question
    pub fn record_results(&mut self, subject: Subject, questions: &[Question], results: &[bool]) {
        self.absorb_generated();
        let now = Utc::now();
        let recent_window = self.config.recent_window;

        for (question, correct) in questions.iter().zip(results) {
            let bank = self.data.subjects.entry(subject).or_default();
            let position = bank.iter().position(|b| b.id() == question.id).or_else(|| {
                let text = question.normalized_text();
                bank.iter().position(|b| b.question.normalized_text() == text)
            });
            let Some(position) = position else {
                warn!(%subject, id = %question.id, "Result for a question not in the bank");
                continue;
            };

            let banked = &mut bank[position];
            banked.record(*correct, now);
            let id = banked.id().to_string();

            let ring = self.data.recently_shown.entry(subject).or_default();
            ring.retain(|existing| *existing != id);
            ring.push_front(id);
            ring.truncate(recent_window);
        }
    }

    /// Drop mastered questions not shown within the grace period
    pub fn prune_mastered(&mut self, subject: Subject) -> usize {
        let threshold = self.config.mastery_threshold;
        let grace = Duration::days(self.config.mastered_grace_days);
        let now = Utc::now();
        let Some(bank) = self.data.subjects.get_mut(&subject) else {
            return 0;
        };
        let before = bank.len();
        bank.retain(|b| !b.removal_eligible(threshold, grace, now));
        let removed = before - bank.len();
        if removed > 0 {
            info!(%subject, removed, "Pruned mastered questions");
        }
        removed
    }

    // ========================================================================
    // Seeding and replenishment
    // ========================================================================

    /// Import the static catalog into an empty subject bank
    pub fn quick_seed_from_static(&mut self, subject: Subject) -> usize {
        if self.count(subject) > 0 {
            return 0;
        }
        let now = Utc::now();
        let seeded: Vec<BankedQuestion> = self
            .catalog
            .for_subject(subject)
            .iter()
            .map(|q| BankedQuestion::new(q.clone(), QuestionSource::Static, now))
            .collect();
        let count = seeded.len();
        self.data.subjects.insert(subject, seeded);
        info!(%subject, count, "Seeded bank from static catalog");
        count
    }

    /// Seed empty subjects and start generation wherever supply is short
    pub fn seed_all_subjects_if_needed(&mut self, tier: DifficultyTier, grade_level: u8) -> Vec<JoinHandle<()>> {
        self.absorb_generated();
        let mut handles = Vec::new();
        for subject in Subject::ALL {
            self.quick_seed_from_static(subject);
            if self.supply(subject) >= self.config.target_supply || self.in_flight.contains(&subject) {
                continue;
            }
            if let Some(handle) = self.schedule(subject, tier, grade_level) {
                handles.push(handle);
            }
        }
        handles
    }

    /// Post-quiz upkeep: prune, then schedule generation if supply is low.
    /// Never blocks; the returned task delivers into the bank's channel.
    pub fn replenish_after_quiz(
        &mut self,
        subject: Subject,
        tier: DifficultyTier,
        grade_level: u8,
        quiz_results: &[bool],
    ) -> Option<JoinHandle<()>> {
        self.absorb_generated();
        self.prune_mastered(subject);

        let supply = self.supply(subject);
        if supply >= self.config.target_supply {
            debug!(%subject, supply, "Supply sufficient, no replenishment");
            return None;
        }
        if self.in_flight.contains(&subject) {
            debug!(%subject, "Replenishment already in flight");
            return None;
        }
        if let Some(last) = self.data.last_replenished.get(&subject) {
            let cooldown = Duration::seconds(self.config.replenish_cooldown_secs);
            if Utc::now() - *last < cooldown {
                debug!(%subject, "Replenishment on cooldown");
                return None;
            }
        }

        let request_tier = steer_tier(tier, quiz_results);
        self.schedule(subject, request_tier, grade_level)
    }

    fn schedule(&mut self, subject: Subject, tier: DifficultyTier, grade_level: u8) -> Option<JoinHandle<()>> {
        let (Some(generator), Some(runtime)) = (self.generator.clone(), self.runtime.clone()) else {
            debug!(%subject, "No generator configured, skipping replenishment");
            return None;
        };

        let request = GenerationRequest {
            subject,
            tier,
            grade_level,
            count: self.config.batch_size,
        };
        debug!(%subject, %tier, count = request.count, generator = generator.name(), "Scheduling question generation");

        self.in_flight.insert(subject);
        self.data.last_replenished.insert(subject, Utc::now());

        let tx = self.generated_tx.clone();
        Some(runtime.spawn(async move {
            let result = match tokio::task::spawn_blocking(move || generator.generate(&request)).await {
                Ok(Ok(questions)) => Ok(questions),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("generator task failed: {}", e)),
            };
            // The bank may have been dropped; nothing to deliver to then
            let _ = tx.send(GeneratedBatch { subject, result });
        }))
    }

    /// Take in everything background generation has delivered so far
    pub fn absorb_generated(&mut self) -> usize {
        let mut absorbed = 0;
        while let Ok(batch) = self.generated_rx.try_recv() {
            self.in_flight.remove(&batch.subject);
            match batch.result {
                Ok(questions) => absorbed += self.absorb_batch(batch.subject, questions),
                Err(e) => warn!(subject = %batch.subject, error = %e, "Question generation failed"),
            }
        }
        absorbed
    }

    fn absorb_batch(&mut self, subject: Subject, questions: Vec<Question>) -> usize {
        let now = Utc::now();
        let bank = self.data.subjects.entry(subject).or_default();
        let mut known_ids: HashSet<String> = bank.iter().map(|b| b.id().to_string()).collect();
        let mut known_texts: HashSet<String> = bank.iter().map(|b| b.question.normalized_text()).collect();

        let mut added = 0;
        for question in questions {
            if let Err(e) = question.validate() {
                warn!("Dropping generated question: {}", e);
                continue;
            }
            if question.subject != subject {
                warn!(id = %question.id, expected = %subject, found = %question.subject, "Dropping generated question for wrong subject");
                continue;
            }
            if !known_texts.insert(question.normalized_text()) || !known_ids.insert(question.id.clone()) {
                debug!(id = %question.id, "Dropping duplicate generated question");
                continue;
            }
            bank.push(BankedQuestion::new(question, QuestionSource::Generated, now));
            added += 1;
        }

        self.data.last_replenished.insert(subject, now);
        info!(%subject, added, "Absorbed generated questions");
        added
    }
}

fn steer_tier(tier: DifficultyTier, quiz_results: &[bool]) -> DifficultyTier {
    if quiz_results.is_empty() {
        return tier;
    }
    let accuracy = quiz_results.iter().filter(|c| **c).count() as f32 / quiz_results.len() as f32;
    if accuracy >= STEER_UP_ACCURACY {
        tier.next().unwrap_or(tier)
    } else if accuracy <= STEER_DOWN_ACCURACY {
        tier.previous().unwrap_or(tier)
    } else {
        tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::replenish::ArithmeticGenerator;
    use crate::error::GenerationError;
    use crate::question::AnswerPayload;

    fn mc(id: &str, tier: DifficultyTier) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            payload: AnswerPayload::MultipleChoice {
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index: 0,
            },
            explanation: String::new(),
            subject: Subject::Math,
            tier,
            grade_level: 1,
        }
    }

    fn tf(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Statement {}", id),
            payload: AnswerPayload::TrueFalse { correct_answer: true },
            explanation: String::new(),
            subject: Subject::Math,
            tier: DifficultyTier::Beginner,
            grade_level: 1,
        }
    }

    fn bank_with(questions: Vec<Question>) -> QuestionBank {
        let now = Utc::now();
        let mut data = QuestionBankData::default();
        data.subjects.insert(
            Subject::Math,
            questions
                .into_iter()
                .map(|q| BankedQuestion::new(q, QuestionSource::Static, now))
                .collect(),
        );
        QuestionBank::from_data(BankConfig::default(), Arc::new(StaticCatalog::new()), data).with_rng_seed(42)
    }

    fn ids(questions: &[Question]) -> HashSet<String> {
        questions.iter().map(|q| q.id.clone()).collect()
    }

    #[test]
    fn test_invalid_saved_questions_are_dropped() {
        let mut broken = mc("broken", DifficultyTier::Beginner);
        broken.payload = AnswerPayload::MultipleChoice {
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 9,
        };
        let mut questions: Vec<Question> = (0..5).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect();
        questions.push(broken);

        let mut bank = bank_with(questions);
        assert_eq!(bank.count(Subject::Math), 5);
        assert!(bank.get("broken").is_none());
        let drawn = bank.draw(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        assert!(drawn.iter().all(|q| q.id != "broken"));
    }

    #[test]
    fn test_draw_requires_minimum_candidates() {
        let mut bank = bank_with((0..4).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect());
        assert!(bank.draw(Subject::Math, DifficultyTier::Beginner, 3, 1).is_none());

        let mut bank = bank_with((0..6).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect());
        let drawn = bank.draw(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        assert_eq!(drawn.len(), 5);
        assert_eq!(ids(&drawn).len(), 5);
        // Exact tier only
        assert!(bank.draw(Subject::Math, DifficultyTier::Easy, 5, 1).is_none());
    }

    #[test]
    fn test_draw_prefers_unmastered_and_unseen() {
        let mut bank = bank_with((0..8).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect());

        // q0..q2 mastered long ago (not recent), q3 and q4 shown recently
        let mastered: Vec<Question> = (0..3).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect();
        for _ in 0..3 {
            bank.record_results(Subject::Math, &mastered, &[true, true, true]);
        }
        bank.data.recently_shown.insert(Subject::Math, VecDeque::new());
        let seen = vec![mc("q3", DifficultyTier::Beginner), mc("q4", DifficultyTier::Beginner)];
        bank.record_results(Subject::Math, &seen, &[false, false]);

        let drawn = bank.draw(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        let first_three = ids(&drawn[..3]);
        assert_eq!(first_three, ids(&[mc("q5", DifficultyTier::Beginner), mc("q6", DifficultyTier::Beginner), mc("q7", DifficultyTier::Beginner)]));
        assert_eq!(ids(&drawn[3..]), ids(&seen));
    }

    #[test]
    fn test_mastered_and_recent_is_ineligible() {
        let mut bank = bank_with((0..6).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect());
        let q0 = vec![mc("q0", DifficultyTier::Beginner)];
        for _ in 0..3 {
            bank.record_results(Subject::Math, &q0, &[true]);
        }
        assert_eq!(bank.mastered_count(Subject::Math), 1);
        // Only five eligible remain, so a draw of 5 must exclude q0
        let drawn = bank.draw(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        assert!(!ids(&drawn).contains("q0"));
    }

    #[test]
    fn test_recent_ring_is_capped_and_moves_to_front() {
        let questions: Vec<Question> = (0..20).map(|i| mc(&format!("q{}", i), DifficultyTier::Beginner)).collect();
        let mut bank = bank_with(questions.clone());
        bank.record_results(Subject::Math, &questions, &[false; 20]);
        bank.record_results(Subject::Math, &questions[10..11], &[true]);

        let ring = &bank.data().recently_shown[&Subject::Math];
        assert_eq!(ring.len(), 15);
        assert_eq!(ring.front().map(String::as_str), Some("q10"));
        assert_eq!(ring.iter().filter(|id| *id == "q10").count(), 1);
        assert!(!ring.contains(&"q0".to_string()));
    }

    #[test]
    fn test_record_results_falls_back_to_text() {
        let mut bank = bank_with(vec![mc("q1", DifficultyTier::Beginner)]);
        let mut copy = mc("other-id", DifficultyTier::Beginner);
        copy.text = "  question   Q1 ".to_string();
        bank.record_results(Subject::Math, &[copy], &[true]);
        assert_eq!(bank.get("q1").map(|b| b.times_correct), Some(1));
    }

    #[test]
    fn test_mixed_draw_takes_half_non_choice() {
        let mut questions: Vec<Question> = (0..6).map(|i| mc(&format!("m{}", i), DifficultyTier::Beginner)).collect();
        questions.extend((0..4).map(|i| tf(&format!("t{}", i))));
        let mut bank = bank_with(questions);

        let drawn = bank.draw_mixed(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        let non_mc = drawn.iter().filter(|q| q.modality() != Modality::MultipleChoice).count();
        assert_eq!(drawn.len(), 5);
        assert_eq!(non_mc, 3);
    }

    #[test]
    fn test_mixed_draw_degrades_to_plain() {
        let mut questions: Vec<Question> = (0..6).map(|i| mc(&format!("m{}", i), DifficultyTier::Beginner)).collect();
        questions.push(tf("t0"));
        let mut bank = bank_with(questions);

        let drawn = bank.draw_mixed(Subject::Math, DifficultyTier::Beginner, 5, 1).unwrap();
        assert!(drawn.iter().all(|q| q.modality() == Modality::MultipleChoice));
    }

    #[test]
    fn test_quick_seed_only_when_empty() {
        let mut bank = QuestionBank::new(BankConfig::default(), Arc::new(StaticCatalog::bundled()));
        let seeded = bank.quick_seed_from_static(Subject::Reading);
        assert!(seeded > 0);
        assert_eq!(bank.count(Subject::Reading), seeded);
        assert_eq!(bank.quick_seed_from_static(Subject::Reading), 0);
        assert!(bank.get("read-b-09").is_some_and(|b| b.source == QuestionSource::Static));
    }

    #[test]
    fn test_prune_respects_grace_period() {
        let mut bank = bank_with(vec![mc("old", DifficultyTier::Beginner), mc("fresh", DifficultyTier::Beginner)]);
        let long_ago = Utc::now() - Duration::days(10);
        for banked in bank.data.subjects.get_mut(&Subject::Math).unwrap() {
            banked.times_shown = 3;
            banked.times_correct = 3;
            banked.last_shown = Some(if banked.id() == "old" { long_ago } else { Utc::now() });
        }
        assert_eq!(bank.prune_mastered(Subject::Math), 1);
        assert!(bank.get("old").is_none());
        assert!(bank.get("fresh").is_some());
    }

    #[test]
    fn test_steer_tier() {
        assert_eq!(steer_tier(DifficultyTier::Easy, &[true, true, true, true, false]), DifficultyTier::Medium);
        assert_eq!(steer_tier(DifficultyTier::Easy, &[true, false, false, true, false]), DifficultyTier::Beginner);
        assert_eq!(steer_tier(DifficultyTier::Easy, &[true, true, true, false, false]), DifficultyTier::Easy);
        assert_eq!(steer_tier(DifficultyTier::Advanced, &[true; 5]), DifficultyTier::Advanced);
    }

    #[test]
    fn test_bank_data_round_trip() {
        let mut bank = bank_with((0..3).map(|i| mc(&format!("q{}", i), DifficultyTier::Easy)).collect());
        bank.record_results(Subject::Math, &[mc("q1", DifficultyTier::Easy)], &[true]);

        let json = serde_json::to_string(bank.data()).unwrap();
        let data: QuestionBankData = serde_json::from_str(&json).unwrap();
        assert_eq!(&data, bank.data());
        assert_eq!(data.recently_shown[&Subject::Math], VecDeque::from(vec!["q1".to_string()]));
    }

    #[tokio::test]
    async fn test_replenish_schedules_and_absorbs() {
        let generator: Arc<dyn QuestionGenerator> = Arc::new(ArithmeticGenerator::with_seed(3));
        let mut bank = bank_with(vec![mc("q0", DifficultyTier::Beginner)])
            .with_generator(generator, Handle::current());

        let handle = bank
            .replenish_after_quiz(Subject::Math, DifficultyTier::Beginner, 2, &[true, false, true])
            .expect("supply is low, generation should be scheduled");
        assert!(bank.is_replenishing(Subject::Math));

        // Cooldown and in-flight both block a second request
        assert!(bank.replenish_after_quiz(Subject::Math, DifficultyTier::Beginner, 2, &[]).is_none());

        handle.await.unwrap();
        let absorbed = bank.absorb_generated();
        assert!(absorbed > 0);
        assert_eq!(bank.count(Subject::Math), 1 + absorbed);
        assert!(!bank.is_replenishing(Subject::Math));
        assert!(bank.data().subjects[&Subject::Math].iter().any(|b| b.source == QuestionSource::Generated));

        // Still on cooldown after delivery
        assert!(bank.replenish_after_quiz(Subject::Math, DifficultyTier::Beginner, 2, &[]).is_none());
    }

    struct FailingGenerator;

    impl QuestionGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        fn generate(&self, _request: &GenerationRequest) -> Result<Vec<Question>, GenerationError> {
            Err(GenerationError::Failed("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_generation_clears_in_flight() {
        let mut bank = bank_with(vec![]).with_generator(Arc::new(FailingGenerator), Handle::current());
        let handles = bank.seed_all_subjects_if_needed(DifficultyTier::Beginner, 1);
        assert_eq!(handles.len(), Subject::ALL.len());
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(bank.absorb_generated(), 0);
        assert!(!bank.is_replenishing(Subject::Science));
    }

    #[test]
    fn test_no_generator_never_schedules() {
        let mut bank = bank_with(vec![mc("q0", DifficultyTier::Beginner)]);
        assert!(bank.replenish_after_quiz(Subject::Math, DifficultyTier::Beginner, 1, &[true]).is_none());
        assert!(!bank.is_replenishing(Subject::Math));
    }
}
