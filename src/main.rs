use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use learning_engine::bank::{ArithmeticGenerator, QuestionGenerator};
use learning_engine::persistence::{DocumentStore, FileStore};
use learning_engine::quest::QuestRegistry;
use learning_engine::question::{AnswerPayload, StaticCatalog};
use learning_engine::round::{Abilities, InputAction, RoundEvent, RoundKind, RoundPhase};
use learning_engine::{EngineConfig, EngineError, LearnerSession, Subject};

/// Simulated frame time (20 Hz)
const TICK_SECS: f32 = 0.05;

/// Rounds the scripted player attempts
const SCRIPT: [(Subject, RoundKind); 8] = [
    (Subject::Math, RoundKind::MultipleChoice),
    (Subject::Reading, RoundKind::MultipleChoice),
    (Subject::Math, RoundKind::Mixed),
    (Subject::Science, RoundKind::MultipleChoice),
    (Subject::Math, RoundKind::MultipleChoice),
    (Subject::Reading, RoundKind::Mixed),
    (Subject::Science, RoundKind::TrueFalse),
    (Subject::Math, RoundKind::MultipleChoice),
];

// ============================================================================
// Auto player
// ============================================================================

/// Answers choice questions after a short think, right most of the time.
/// Ordering and matching puzzles are left to run out the clock.
struct AutoPlayer {
    rng: StdRng,
    accuracy: f64,
    think_left: f32,
}

impl AutoPlayer {
    fn new(accuracy: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            accuracy,
            think_left: 0.0,
        }
    }

    fn on_question_started(&mut self) {
        self.think_left = self.rng.gen_range(0.5..4.0);
    }

    /// Input to send this tick, if any
    fn act(&mut self, payload: &AnswerPayload) -> Option<InputAction> {
        self.think_left -= TICK_SECS;
        if self.think_left > 0.0 {
            return None;
        }
        let right = self.rng.gen_bool(self.accuracy);
        match payload {
            AnswerPayload::MultipleChoice { correct_index, .. } => {
                let choice = if right { *correct_index } else { (correct_index + self.rng.gen_range(1..4)) % 4 };
                Some(InputAction::Select(choice))
            }
            AnswerPayload::TrueFalse { correct_answer } => {
                Some(InputAction::Select(if *correct_answer == right { 0 } else { 1 }))
            }
            AnswerPayload::Ordering { .. } | AnswerPayload::Matching { .. } => None,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    learning_engine::telemetry::init_tracing();

    let data_dir = PathBuf::from(std::env::var("ENGINE_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    let save_dir = PathBuf::from(std::env::var("ENGINE_SAVE_DIR").unwrap_or_else(|_| "saves".to_string()));
    let profile_id = std::env::var("ENGINE_PROFILE").unwrap_or_else(|_| "demo".to_string());

    let config = EngineConfig::from_env();

    let mut catalog = StaticCatalog::bundled();
    // Bundled files live in data/catalog; data/catalog.d holds additions
    let extra = data_dir.join("catalog.d");
    if extra.exists() {
        match catalog.load_from_directory(&extra) {
            Ok(count) => info!("Loaded {} extra catalog questions", count),
            Err(e) => warn!("Failed to load extra catalog: {}", e),
        }
    }

    let registry = match QuestRegistry::load_from_directory(&data_dir.join("quests")) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Quest definitions are invalid, running without quests: {}", e);
            QuestRegistry::new()
        }
    };

    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(save_dir));
    let generator: Arc<dyn QuestionGenerator> = Arc::new(ArithmeticGenerator::new());

    let mut session = LearnerSession::open(
        &profile_id,
        config,
        store,
        Arc::new(catalog),
        Arc::new(registry),
        Some(generator),
        Some(Handle::current()),
    );
    let warmups = session.prewarm();
    info!("Started {} background generation tasks", warmups.len());

    run_intro(&mut session);

    let mut player = AutoPlayer::new(0.8);
    let mut pending = warmups;
    for (subject, kind) in SCRIPT {
        match play_round(&mut session, &mut player, subject, kind).await {
            Ok(Some(handle)) => pending.push(handle),
            Ok(None) => {}
            Err(e) => warn!(%subject, kind = kind.as_str(), "Round skipped: {}", e),
        }
        turn_in_ready_quests(&mut session);
    }

    for handle in pending {
        if let Err(e) = handle.await {
            warn!("Generation task failed: {}", e);
        }
    }

    if let Err(e) = session.save() {
        error!("Final save failed: {}", e);
    }
    for subject in Subject::ALL {
        info!(
            %subject,
            tier = %session.adapter().tier(subject),
            accuracy = session.adapter().lifetime_accuracy(subject),
            banked = session.bank().count(subject),
            "Subject summary"
        );
    }
    info!(xp = session.xp_earned(), completed_quests = session.tracker().state().completed.len(), "Session finished");
}

/// Walk the learner through the opening quest
fn run_intro(session: &mut LearnerSession) {
    if session.accept_quest("welcome_owl") {
        info!("Accepted welcome_owl");
    }
    session.npc_talked_to("owl");
    session.room_visited("library");
    turn_in_ready_quests(session);
    session.level_reached(2);
    session.room_visited("lab");
}

/// Complete everything that is ready and accept everything newly available
fn turn_in_ready_quests(session: &mut LearnerSession) {
    for id in session.tracker().registry().all_ids() {
        if session.tracker().is_ready(&id) {
            if let Some(reward) = session.complete_quest(&id) {
                info!(quest_id = %id, xp = reward.xp, "Quest reward");
            }
        }
    }
    for id in session.tracker().registry().all_ids() {
        if session.tracker().can_accept(&id) && session.accept_quest(&id) {
            info!(quest_id = %id, "Accepted quest");
        }
    }
}

/// Play one round to completion, yielding to the runtime every tick so
/// background generation can make progress
async fn play_round(
    session: &mut LearnerSession,
    player: &mut AutoPlayer,
    subject: Subject,
    kind: RoundKind,
) -> Result<Option<tokio::task::JoinHandle<()>>, EngineError> {
    let abilities = Abilities {
        second_chance: true,
        hint: false,
    };
    let mut events = session.start_round(subject, kind, abilities)?;

    loop {
        for event in events.drain(..) {
            match event {
                RoundEvent::QuestionStarted { .. } | RoundEvent::QuestionReopened { .. } => player.on_question_started(),
                RoundEvent::RoundComplete(result) => info!(%subject, "{}", result.summary),
                _ => {}
            }
        }
        if session.round_complete() {
            break;
        }

        let action = session.round().and_then(|round| {
            if round.phase() != RoundPhase::Answering {
                return None;
            }
            round.current_question().map(|q| q.payload.clone())
        });
        if let Some(payload) = action {
            if let Some(input) = player.act(&payload) {
                events.extend(session.handle_input(input));
            }
        }
        events.extend(session.update(TICK_SECS));
        tokio::task::yield_now().await;
    }

    let Some(outcome) = session.finish_round() else {
        return Ok(None);
    };
    if outcome.tier_changed() {
        info!(%subject, from = %outcome.tier_before, to = %outcome.tier_after, "Difficulty changed");
    }
    Ok(outcome.replenishment)
}
