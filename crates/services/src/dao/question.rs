use bson::{DateTime, doc, oid::ObjectId};
use callpilot_db::models::StoredQuestion;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct QuestionDao {
    pub base: BaseDao<StoredQuestion>,
}

impl QuestionDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, StoredQuestion::COLLECTION),
        }
    }

    pub async fn record(
        &self,
        session_id: ObjectId,
        prompt: &str,
        category: Option<&str>,
    ) -> DaoResult<ObjectId> {
        let question = StoredQuestion {
            id: None,
            session_id,
            prompt: prompt.to_string(),
            category: category.map(str::to_string),
            created_at: DateTime::now(),
        };
        self.base.insert_one(&question).await
    }

    pub async fn find_by_session(&self, session_id: ObjectId) -> DaoResult<Vec<StoredQuestion>> {
        self.base
            .find_many(
                doc! { "session_id": session_id },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }
}
