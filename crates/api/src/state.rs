use std::sync::Arc;

use callpilot_config::{OrchestratorSettings, Settings};
use callpilot_orchestration::{Collaborators, OrchestratorConfig, SessionEngine};
use callpilot_services::{
    ClaudeAdequacyAnalyzer, ClaudeChecklistAnalyzer, ClaudeClient, ClaudeQuestionGenerator,
    MongoSegmentStore,
    dao::{
        checklist::ChecklistDao, question::QuestionDao, session::SessionDao,
        transcript::TranscriptDao,
    },
};
use mongodb::Database;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub sessions: Arc<SessionDao>,
    pub transcripts: Arc<TranscriptDao>,
    pub checklists: Arc<ChecklistDao>,
    pub questions: Arc<QuestionDao>,
    pub engine: Arc<SessionEngine>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let sessions = Arc::new(SessionDao::new(&db));
        let transcripts = Arc::new(TranscriptDao::new(&db));
        let checklists = Arc::new(ChecklistDao::new(&db));
        let questions = Arc::new(QuestionDao::new(&db));

        let claude = ClaudeClient::new(
            settings.claude.api_key.clone(),
            settings.claude.model.clone(),
            settings.claude.max_tokens,
        );
        if !claude.is_available() {
            warn!("Claude API key not configured; adequacy falls back to heuristics and no questions will be generated");
        }

        let collaborators = Collaborators {
            adequacy: Arc::new(ClaudeAdequacyAnalyzer::new(claude.clone())),
            checklist: Arc::new(ClaudeChecklistAnalyzer::new(claude.clone())),
            generator: Arc::new(
                ClaudeQuestionGenerator::new(claude).with_log(Arc::clone(&questions)),
            ),
            store: Arc::new(MongoSegmentStore::new(Arc::clone(&transcripts))),
        };

        let (engine, _events_rx) =
            SessionEngine::new(orchestrator_config(&settings.orchestrator), collaborators);

        Self {
            db,
            settings,
            sessions,
            transcripts,
            checklists,
            questions,
            engine,
        }
    }
}

fn orchestrator_config(settings: &OrchestratorSettings) -> OrchestratorConfig {
    OrchestratorConfig {
        min_caption_chars: settings.min_caption_chars,
        pause_check_delay_ms: settings.pause_check_delay_ms,
        pause_threshold_ms: settings.pause_threshold_ms,
        server_pause_threshold_ms: settings.server_pause_threshold_ms,
        active_speech_window_ms: settings.active_speech_window_ms,
        min_question_interval_ms: settings.min_question_interval_ms,
        adequacy_throttle_ms: settings.adequacy_throttle_ms,
        agent_floor_delay_ms: settings.agent_floor_delay_ms,
        transcript_window: settings.transcript_window,
        asked_question_history: settings.asked_question_history,
        completion_confidence_threshold: settings.completion_confidence_threshold,
        generate_initial_question: settings.generate_initial_question,
        initial_question_delay_ms: settings.initial_question_delay_ms,
    }
}
