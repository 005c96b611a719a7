use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;

use callpilot_orchestration::{SegmentStore, Speaker, TranscriptSegment};

use crate::dao::transcript::TranscriptDao;

/// MongoDB-backed implementation of the core's segment persistence boundary.
pub struct MongoSegmentStore {
    transcripts: Arc<TranscriptDao>,
}

impl MongoSegmentStore {
    pub fn new(transcripts: Arc<TranscriptDao>) -> Self {
        Self { transcripts }
    }
}

#[async_trait]
impl SegmentStore for MongoSegmentStore {
    async fn store_segment(
        &self,
        session_id: ObjectId,
        segment: &TranscriptSegment,
    ) -> anyhow::Result<()> {
        self.transcripts
            .upsert_segment(
                session_id,
                segment.id as i64,
                speaker_label(segment.speaker),
                &segment.text,
                bson::DateTime::from_chrono(segment.timestamp),
                segment.confidence,
            )
            .await?;
        Ok(())
    }
}

pub fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::Agent => "agent",
        Speaker::Client => "client",
        Speaker::Unknown => "unknown",
    }
}
