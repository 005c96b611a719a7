use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One transcript segment of a call session.
///
/// Captions rewrite the same utterance word by word, so a segment is upserted
/// by `(session_id, segment_id)` and its `text` converges to the final
/// rendering once the speaker changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSegment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    /// Monotonic per-session segment counter.
    pub segment_id: i64,
    /// "agent", "client" or "unknown".
    pub speaker: String,
    pub text: String,
    pub timestamp: DateTime,
    pub confidence: Option<f64>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl StoredSegment {
    pub const COLLECTION: &'static str = "transcript_segments";
}
