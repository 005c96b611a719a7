use bson::{doc, oid::ObjectId};
use callpilot_db::models::StoredSegment;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct TranscriptDao {
    pub base: BaseDao<StoredSegment>,
}

impl TranscriptDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, StoredSegment::COLLECTION),
        }
    }

    /// Upserts one segment keyed by `(session_id, segment_id)`. Captions
    /// rewrite the same utterance, so later writes simply overwrite the text;
    /// last-write-wins is fine within one segment.
    pub async fn upsert_segment(
        &self,
        session_id: ObjectId,
        segment_id: i64,
        speaker: &str,
        text: &str,
        timestamp: bson::DateTime,
        confidence: Option<f64>,
    ) -> DaoResult<()> {
        self.base
            .upsert_one(
                doc! { "session_id": session_id, "segment_id": segment_id },
                doc! {
                    "$set": {
                        "session_id": session_id,
                        "segment_id": segment_id,
                        "speaker": speaker,
                        "text": text,
                        "timestamp": timestamp,
                        "confidence": confidence,
                    }
                },
            )
            .await
    }

    pub async fn find_by_session(&self, session_id: ObjectId) -> DaoResult<Vec<StoredSegment>> {
        self.base
            .find_many(
                doc! { "session_id": session_id },
                Some(doc! { "segment_id": 1 }),
            )
            .await
    }
}
