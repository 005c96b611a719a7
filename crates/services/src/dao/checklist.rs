use bson::{DateTime, doc, oid::ObjectId};
use callpilot_db::models::{ChecklistTemplate, SessionChecklist, SessionChecklistItem, TemplateItem};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct ChecklistDao {
    templates: BaseDao<ChecklistTemplate>,
    session_checklists: BaseDao<SessionChecklist>,
}

impl ChecklistDao {
    pub fn new(db: &Database) -> Self {
        Self {
            templates: BaseDao::new(db, ChecklistTemplate::COLLECTION),
            session_checklists: BaseDao::new(db, SessionChecklist::COLLECTION),
        }
    }

    pub async fn get_template(&self, user_id: ObjectId) -> DaoResult<Option<ChecklistTemplate>> {
        self.templates.find_one(doc! { "user_id": user_id }).await
    }

    pub async fn upsert_template(
        &self,
        user_id: ObjectId,
        items: Vec<TemplateItem>,
    ) -> DaoResult<ChecklistTemplate> {
        let items_bson = bson::to_bson(&items)?;
        self.templates
            .upsert_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "user_id": user_id, "items": items_bson } },
            )
            .await?;
        self.get_template(user_id).await?.ok_or(DaoError::NotFound)
    }

    /// Writes the final checklist state of a completed session.
    pub async fn save_session_checklist(
        &self,
        session_id: ObjectId,
        items: Vec<SessionChecklistItem>,
    ) -> DaoResult<()> {
        let items_bson = bson::to_bson(&items)?;
        self.session_checklists
            .upsert_one(
                doc! { "session_id": session_id },
                doc! { "$set": { "session_id": session_id, "items": items_bson } },
            )
            .await
    }

    pub async fn get_session_checklist(
        &self,
        session_id: ObjectId,
    ) -> DaoResult<Option<SessionChecklist>> {
        self.session_checklists
            .find_one(doc! { "session_id": session_id })
            .await
    }
}

/// Session-end snapshot of live checklist state into the stored shape.
pub fn to_session_items(
    items: &[callpilot_orchestration::ChecklistItem],
) -> Vec<SessionChecklistItem> {
    items
        .iter()
        .map(|item| SessionChecklistItem {
            item_id: item.id,
            label: item.label.clone(),
            completed: item.completed,
            extracted_info: item.extracted_info.clone(),
            completed_at: item.completed_at.map(DateTime::from_chrono),
        })
        .collect()
}

/// Seeds a fresh session checklist from the user's stored template.
pub fn from_template(template: &ChecklistTemplate) -> Vec<callpilot_orchestration::ChecklistItem> {
    template
        .items
        .iter()
        .map(|item| callpilot_orchestration::ChecklistItem {
            id: item.item_id,
            label: item.label.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            order: item.order,
            required: item.required,
            completed: false,
            extracted_info: None,
            completed_at: None,
        })
        .collect()
}
