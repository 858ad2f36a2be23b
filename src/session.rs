//! Learner Session
//!
//! Ties one learner's bank, difficulty adapter and quest tracker to a
//! document store and runs at most one challenge round at a time.
//!
//! Flow of a round:
//! 1. `start_round` draws questions, walking the fallback chain
//! 2. The host forwards `handle_input` / `update` and renders the events
//! 3. Once the round reports complete, `finish_round` feeds the results to
//!    every subsystem and saves

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bank::{BANK_DOC_VERSION, QuestionBank, QuestionBankData, QuestionGenerator};
use crate::config::EngineConfig;
use crate::difficulty::{DIFFICULTY_DOC_VERSION, DifficultyAdapter, DifficultyState};
use crate::error::EngineError;
use crate::persistence::{DocumentKind, DocumentStore, decode_or_default};
use crate::quest::{
    ProgressHistory, QUEST_DOC_VERSION, QuestEventResult, QuestObjectiveTracker, QuestRegistry, QuestRuntimeState, Reward,
};
use crate::question::{Question, StaticCatalog};
use crate::round::{Abilities, ChallengeRound, InputAction, RoundEvent, RoundKind, RoundResult};
use crate::subject::{DifficultyTier, Subject};

/// Grade level used for generation until the host sets one
const DEFAULT_GRADE_LEVEL: u8 = 1;

/// What a finished round changed
#[derive(Debug)]
pub struct RoundOutcome {
    pub subject: Subject,
    pub kind: RoundKind,
    pub result: RoundResult,
    pub tier_before: DifficultyTier,
    pub tier_after: DifficultyTier,
    /// Objective progress caused by the round
    pub quest_updates: Vec<QuestEventResult>,
    /// Background generation started by the round, if any
    pub replenishment: Option<JoinHandle<()>>,
}

impl RoundOutcome {
    pub fn tier_changed(&self) -> bool {
        self.tier_before != self.tier_after
    }
}

struct ActiveRound {
    subject: Subject,
    round: ChallengeRound,
}

pub struct LearnerSession {
    profile_id: String,
    config: EngineConfig,
    store: Arc<dyn DocumentStore>,
    bank: QuestionBank,
    adapter: DifficultyAdapter,
    tracker: QuestObjectiveTracker,
    active: Option<ActiveRound>,
    grade_level: u8,
    xp_earned: u32,
}

impl LearnerSession {
    /// Load a learner's documents and build the session. Unreadable or
    /// corrupt documents start over from defaults.
    pub fn open(
        profile_id: &str,
        config: EngineConfig,
        store: Arc<dyn DocumentStore>,
        catalog: Arc<StaticCatalog>,
        registry: Arc<QuestRegistry>,
        generator: Option<Arc<dyn QuestionGenerator>>,
        runtime: Option<Handle>,
    ) -> Self {
        let bank_doc = load_document(store.as_ref(), profile_id, DocumentKind::Bank);
        let difficulty_doc = load_document(store.as_ref(), profile_id, DocumentKind::Difficulty);
        let quest_doc = load_document(store.as_ref(), profile_id, DocumentKind::Quests);

        let bank_data: QuestionBankData = bank_doc
            .map(|bytes| decode_or_default(DocumentKind::Bank, &bytes, BANK_DOC_VERSION))
            .unwrap_or_default();
        let mut bank = QuestionBank::from_data(config.bank.clone(), catalog, bank_data);
        if let (Some(generator), Some(runtime)) = (generator, runtime) {
            bank = bank.with_generator(generator, runtime);
        }

        let has_difficulty_history = difficulty_doc.is_some();
        let difficulty_state: DifficultyState = difficulty_doc
            .map(|bytes| decode_or_default(DocumentKind::Difficulty, &bytes, DIFFICULTY_DOC_VERSION))
            .unwrap_or_default();
        let adapter = DifficultyAdapter::from_state(config.difficulty.clone(), difficulty_state);

        let needs_replay = quest_doc.is_none() && has_difficulty_history;
        let quest_state: QuestRuntimeState = quest_doc
            .map(|bytes| decode_or_default(DocumentKind::Quests, &bytes, QUEST_DOC_VERSION))
            .unwrap_or_default();
        let mut tracker = QuestObjectiveTracker::from_state(registry, quest_state);

        let mut xp_earned = 0;
        if needs_replay {
            let history = history_from_adapter(&adapter, tracker.player_level(), config.round.round_size);
            info!(profile_id, "Save predates quest tracking, replaying history");
            let rewards = tracker.replay_history(&history);
            xp_earned += rewards.iter().map(|r| r.xp).sum::<u32>();
        }

        info!(
            profile_id,
            banked = Subject::ALL.iter().map(|s| bank.count(*s)).sum::<usize>(),
            active_quests = tracker.state().active.len(),
            "Session opened"
        );

        Self {
            profile_id: profile_id.to_string(),
            config,
            store,
            bank,
            adapter,
            tracker,
            active: None,
            grade_level: DEFAULT_GRADE_LEVEL,
            xp_earned,
        }
    }

    pub fn with_grade_level(mut self, grade_level: u8) -> Self {
        self.grade_level = grade_level;
        self
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn adapter(&self) -> &DifficultyAdapter {
        &self.adapter
    }

    pub fn tracker(&self) -> &QuestObjectiveTracker {
        &self.tracker
    }

    pub fn round(&self) -> Option<&ChallengeRound> {
        self.active.as_ref().map(|a| &a.round)
    }

    /// XP from rounds and quest rewards this session
    pub fn xp_earned(&self) -> u32 {
        self.xp_earned
    }

    /// Seed empty subjects and start background generation where supply
    /// is short, so the first draw does not stall
    pub fn prewarm(&mut self) -> Vec<JoinHandle<()>> {
        let tier = Subject::ALL
            .iter()
            .map(|s| self.adapter.tier(*s))
            .min()
            .unwrap_or_default();
        self.bank.seed_all_subjects_if_needed(tier, self.grade_level)
    }

    // ========================================================================
    // Rounds
    // ========================================================================

    /// Draw questions and start a round, returning its opening events
    pub fn start_round(&mut self, subject: Subject, kind: RoundKind, abilities: Abilities) -> Result<Vec<RoundEvent>, EngineError> {
        if self.active.is_some() {
            return Err(EngineError::RoundInProgress);
        }

        let questions = self.draw_with_fallback(subject, kind)?;
        let mut round = ChallengeRound::new(kind, questions, abilities, &self.config.round)?;
        let events = round.build();
        info!(%subject, kind = kind.as_str(), questions = round.all_round_questions().len(), "Round started");
        self.active = Some(ActiveRound { subject, round });
        Ok(events)
    }

    /// Current tier first, then the nearest other tiers. An empty subject is
    /// seeded from the static catalog before giving up.
    fn draw_with_fallback(&mut self, subject: Subject, kind: RoundKind) -> Result<Vec<Question>, EngineError> {
        let tier = self.adapter.tier(subject);
        if let Some(questions) = self.draw_any_tier(subject, kind, tier) {
            return Ok(questions);
        }

        let seeded = self.bank.quick_seed_from_static(subject);
        if seeded > 0 {
            if let Some(questions) = self.draw_any_tier(subject, kind, tier) {
                return Ok(questions);
            }
        }

        warn!(%subject, %tier, kind = kind.as_str(), "No content for round");
        Err(EngineError::InsufficientContent { subject, tier })
    }

    fn draw_any_tier(&mut self, subject: Subject, kind: RoundKind, tier: DifficultyTier) -> Option<Vec<Question>> {
        let count = self.config.round.round_size;
        for candidate in tier.by_distance() {
            let drawn = match kind.modality() {
                None => self.bank.draw_mixed(subject, candidate, count, self.grade_level),
                Some(modality) => self.bank.draw_modality(subject, candidate, modality, count, self.grade_level),
            };
            if let Some(questions) = drawn {
                if candidate != tier {
                    debug!(%subject, wanted = %tier, used = %candidate, "Drew round from a neighbouring tier");
                }
                return Some(questions);
            }
        }
        None
    }

    pub fn handle_input(&mut self, action: InputAction) -> Vec<RoundEvent> {
        match self.active.as_mut() {
            Some(active) => active.round.handle_input(action),
            None => Vec::new(),
        }
    }

    pub fn update(&mut self, delta: f32) -> Vec<RoundEvent> {
        match self.active.as_mut() {
            Some(active) => active.round.update(delta),
            None => Vec::new(),
        }
    }

    pub fn round_complete(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.round.is_complete())
    }

    /// Drop the active round without recording anything
    pub fn cancel_round(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.round.teardown();
            info!(subject = %active.subject, "Round cancelled");
        }
    }

    /// Apply a completed round to the adapter, bank and quests, then save.
    /// Returns `None` while no round has completed.
    pub fn finish_round(&mut self) -> Option<RoundOutcome> {
        if !self.round_complete() {
            return None;
        }
        let ActiveRound { subject, round } = self.active.take()?;
        let result = round.aggregate_result();
        let questions = round.all_round_questions();

        let tier_before = self.adapter.tier(subject);
        let mut quest_updates = Vec::new();
        if self.adapter.record_results(subject, &result.results) {
            let tier_after = self.adapter.tier(subject);
            quest_updates.extend(self.tracker.record_difficulty_reached(subject, tier_after));
        }
        let tier_after = self.adapter.tier(subject);

        self.bank.record_results(subject, questions, &result.results);
        let replenishment = self
            .bank
            .replenish_after_quiz(subject, tier_after, self.grade_level, &result.results);

        if result.is_correct {
            quest_updates.extend(self.tracker.record_challenge_complete(subject));
        }
        self.xp_earned += result.xp_awarded;

        info!(
            %subject,
            summary = %result.summary,
            tier = %tier_after,
            quest_updates = quest_updates.len(),
            "Round finished"
        );
        self.save_logged();

        Some(RoundOutcome {
            subject,
            kind: round.kind(),
            result,
            tier_before,
            tier_after,
            quest_updates,
            replenishment,
        })
    }

    // ========================================================================
    // World events
    // ========================================================================

    pub fn room_visited(&mut self, room_id: &str) -> Vec<QuestEventResult> {
        self.tracker.record_room_visit(room_id)
    }

    pub fn npc_talked_to(&mut self, npc_id: &str) -> Vec<QuestEventResult> {
        self.tracker.record_npc_talk(npc_id)
    }

    pub fn level_reached(&mut self, level: u32) -> Vec<QuestEventResult> {
        self.tracker.record_level_reached(level)
    }

    pub fn accept_quest(&mut self, quest_id: &str) -> bool {
        let accepted = self.tracker.accept_quest(quest_id);
        if accepted {
            self.save_logged();
        }
        accepted
    }

    pub fn complete_quest(&mut self, quest_id: &str) -> Option<Reward> {
        let reward = self.tracker.complete_quest(quest_id)?;
        self.xp_earned += reward.xp;
        self.save_logged();
        Some(reward)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write all three documents
    pub fn save(&self) -> Result<(), EngineError> {
        self.save_document(DocumentKind::Bank, self.bank.data())?;
        self.save_document(DocumentKind::Difficulty, self.adapter.state())?;
        self.save_document(DocumentKind::Quests, self.tracker.state())?;
        debug!(profile_id = %self.profile_id, "Session saved");
        Ok(())
    }

    fn save_document<T: Serialize>(&self, kind: DocumentKind, document: &T) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| EngineError::Encode {
            document: kind.as_str(),
            source,
        })?;
        self.store.save(&self.profile_id, kind, &bytes)?;
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            error!(profile_id = %self.profile_id, error = %e, "Failed to save session");
        }
    }
}

fn load_document(store: &dyn DocumentStore, profile_id: &str, kind: DocumentKind) -> Option<Vec<u8>> {
    match store.load(profile_id, kind) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(profile_id, document = kind.as_str(), error = %e, "Failed to read document, starting fresh");
            None
        }
    }
}

/// Best-effort history for saves made before quests existed. Lifetime
/// counters only count answers, so passed rounds are estimated as the
/// most that many correct answers could have passed.
fn history_from_adapter(adapter: &DifficultyAdapter, level: u32, round_size: usize) -> ProgressHistory {
    let majority = (round_size as u32 / 2 + 1).max(1);
    let mut challenges_completed = BTreeMap::new();
    let mut tiers = BTreeMap::new();
    for subject in Subject::ALL {
        let lifetime = adapter.lifetime(subject);
        let passed = lifetime.correct / majority;
        if passed > 0 {
            challenges_completed.insert(subject, passed);
        }
        let tier = adapter.tier(subject);
        if tier > DifficultyTier::Beginner {
            tiers.insert(subject, tier);
        }
    }
    ProgressHistory {
        level,
        challenges_completed,
        tiers,
    }
}
