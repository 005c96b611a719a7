use async_trait::async_trait;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{ChecklistItem, TranscriptSegment};

/// Errors from the external analysis collaborators.
///
/// These are always recoverable: the orchestration core answers a failed
/// adequacy call with its fallback heuristic and treats failed checklist or
/// generation calls as no-ops.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analysis backend unavailable: {0}")]
    Unavailable(String),
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

/// Verdict on whether the client's latest response answers the pending
/// question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerQuality {
    pub has_answered: bool,
    /// More than a bare "yes"/"no"/"maybe".
    pub is_substantial: bool,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A checklist item the collaborator judged as covered by the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistCompletion {
    pub item_id: i64,
    pub extracted_info: String,
    pub confidence: f64,
}

/// Everything the generator needs to propose the next question.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub session_id: ObjectId,
    pub pending_items: Vec<ChecklistItem>,
    pub completed_ids: Vec<i64>,
    pub window: Vec<TranscriptSegment>,
    /// Advisory dedup context; the generator is biased against repeating
    /// these, not forbidden to.
    pub previous_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub prompt: String,
    pub category: Option<String>,
}

/// Judges whether the client's recent turns answer the current question.
#[async_trait]
pub trait AdequacyAnalyzer: Send + Sync + 'static {
    async fn analyze(
        &self,
        question: Option<&str>,
        window: &[TranscriptSegment],
    ) -> Result<AnswerQuality, AnalyzerError>;
}

/// Maps recent transcript onto pending checklist items.
#[async_trait]
pub trait ChecklistAnalyzer: Send + Sync + 'static {
    async fn analyze(
        &self,
        window: &[TranscriptSegment],
        pending: &[ChecklistItem],
    ) -> Result<Vec<ChecklistCompletion>, AnalyzerError>;
}

/// Produces the next question suggestion.
#[async_trait]
pub trait QuestionGenerator: Send + Sync + 'static {
    async fn generate(&self, request: GenerationRequest)
    -> Result<GeneratedQuestion, AnalyzerError>;
}

/// Persistence boundary for transcript segments. Fire-and-forget: the worker
/// logs failures and never retries.
#[async_trait]
pub trait SegmentStore: Send + Sync + 'static {
    async fn store_segment(
        &self,
        session_id: ObjectId,
        segment: &TranscriptSegment,
    ) -> anyhow::Result<()>;
}

/// The bundle of external collaborators a session worker talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub adequacy: Arc<dyn AdequacyAnalyzer>,
    pub checklist: Arc<dyn ChecklistAnalyzer>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub store: Arc<dyn SegmentStore>,
}
