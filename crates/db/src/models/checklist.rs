use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// The per-user checklist template new sessions are seeded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateItem {
    pub item_id: i64,
    pub label: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub order: u32,
    #[serde(default)]
    pub required: bool,
}

impl ChecklistTemplate {
    pub const COLLECTION: &'static str = "checklist_templates";
}

/// Final checklist state of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChecklist {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub session_id: ObjectId,
    #[serde(default)]
    pub items: Vec<SessionChecklistItem>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChecklistItem {
    pub item_id: i64,
    pub label: String,
    pub completed: bool,
    pub extracted_info: Option<String>,
    pub completed_at: Option<DateTime>,
}

impl SessionChecklist {
    pub const COLLECTION: &'static str = "session_checklists";
}
