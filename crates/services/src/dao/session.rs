use bson::{DateTime, doc, oid::ObjectId};
use callpilot_db::models::{CallSession, SessionStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct SessionDao {
    pub base: BaseDao<CallSession>,
}

impl SessionDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, CallSession::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        user_id: ObjectId,
        meeting_url: String,
        client_name: Option<String>,
    ) -> DaoResult<CallSession> {
        let now = DateTime::now();
        let session = CallSession {
            id: None,
            user_id,
            meeting_url,
            client_name,
            status: SessionStatus::Active,
            started_at: now,
            ended_at: None,
            duration_secs: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&session).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<CallSession> {
        self.base.find_by_id(id).await
    }

    pub async fn list_by_user(
        &self,
        user_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<CallSession>> {
        self.base
            .find_paginated(
                doc! { "user_id": user_id },
                Some(doc! { "started_at": -1 }),
                params,
            )
            .await
    }

    /// Marks the session completed and stamps its duration.
    pub async fn complete(&self, id: ObjectId, client_name: Option<String>) -> DaoResult<bool> {
        let session = self.base.find_by_id(id).await?;
        let now = DateTime::now();
        let duration_secs =
            ((now.timestamp_millis() - session.started_at.timestamp_millis()) / 1000).max(0) as u32;

        let mut set = doc! {
            "status": "completed",
            "ended_at": now,
            "duration_secs": duration_secs,
        };
        if let Some(name) = client_name {
            set.insert("client_name", name);
        }

        self.base.update_by_id(id, doc! { "$set": set }).await
    }
}
