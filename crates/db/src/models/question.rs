use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Log of every question suggestion generated for a session. Working memory
/// only keeps the latest prompt; this collection is the durable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuestion {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    pub prompt: String,
    pub category: Option<String>,
    pub created_at: DateTime,
}

impl StoredQuestion {
    pub const COLLECTION: &'static str = "generated_questions";
}
