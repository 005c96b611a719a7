use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A live call being assisted. Created when the agent joins a meeting,
/// completed when they end the session from the sidebar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub meeting_url: String,
    /// First non-agent speaker name seen in the captions.
    pub client_name: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    pub started_at: DateTime,
    pub ended_at: Option<DateTime>,
    pub duration_secs: Option<u32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

impl CallSession {
    pub const COLLECTION: &'static str = "call_sessions";
}
