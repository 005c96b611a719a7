pub mod adequacy;
pub mod checklist;
pub mod collaborator;
pub mod config;
pub mod engine;
pub mod normalizer;
pub mod orchestrator;
pub mod session;
pub mod turns;

pub use collaborator::{
    AdequacyAnalyzer, AnalyzerError, AnswerQuality, ChecklistAnalyzer, ChecklistCompletion,
    Collaborators, GeneratedQuestion, GenerationRequest, QuestionGenerator, SegmentStore,
};
pub use config::OrchestratorConfig;
pub use engine::SessionEngine;
pub use orchestrator::OrchestratorState;
pub use session::{SessionCommand, SessionView};

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who a caption line is attributed to.
///
/// The host page renders the logged-in agent as "You"; every other
/// participant name is treated as the client (single client per call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Client,
    Unknown,
}

/// Raw caption event from the host page.
///
/// Captions are re-rendered word by word, so the same logical utterance
/// arrives many times per second with a growing `text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEvent {
    pub speaker_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// One contiguous utterance by one speaker.
///
/// Mutated in place while the same speaker continues; immutable once another
/// speaker takes the floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Monotonic per-session counter.
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    /// Last-update time.
    pub timestamp: DateTime<Utc>,
    pub confidence: Option<f64>,
}

/// A topic the agent must cover during the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: i64,
    pub label: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub order: u32,
    pub required: bool,
    pub completed: bool,
    pub extracted_info: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The single currently-suggested question shown to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPrompt {
    pub id: Uuid,
    pub prompt: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Events emitted by session workers for subscribers (sidebar UI push,
/// persistence observers).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistEvent {
    SegmentAppended {
        #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
        session_id: ObjectId,
        segment: TranscriptSegment,
    },
    SegmentUpdated {
        #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
        session_id: ObjectId,
        segment: TranscriptSegment,
    },
    ChecklistItemCompleted {
        #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
        session_id: ObjectId,
        item: ChecklistItem,
    },
    PromptUpdated {
        #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
        session_id: ObjectId,
        prompt: QuestionPrompt,
    },
    StateChanged {
        #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
        session_id: ObjectId,
        state: OrchestratorState,
    },
}

impl AssistEvent {
    /// Session this event belongs to, for per-connection filtering.
    pub fn session_id(&self) -> ObjectId {
        match self {
            AssistEvent::SegmentAppended { session_id, .. }
            | AssistEvent::SegmentUpdated { session_id, .. }
            | AssistEvent::ChecklistItemCompleted { session_id, .. }
            | AssistEvent::PromptUpdated { session_id, .. }
            | AssistEvent::StateChanged { session_id, .. } => *session_id,
        }
    }
}
