use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use callpilot_db::models::TemplateItem;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TemplateItemPayload {
    pub item_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub label: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub order: u32,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertTemplateRequest {
    #[validate(nested)]
    pub items: Vec<TemplateItemPayload>,
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let items: Vec<TemplateItemPayload> = state
        .checklists
        .get_template(user_id)
        .await?
        .map(|template| template.items.into_iter().map(to_payload).collect())
        .unwrap_or_default();
    Ok(Json(serde_json::json!({ "items": items })))
}

pub async fn upsert_template(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<UpsertTemplateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let user_id = parse_user_id(&user_id)?;

    let items: Vec<TemplateItem> = body
        .items
        .into_iter()
        .map(|item| TemplateItem {
            item_id: item.item_id,
            label: item.label,
            description: item.description,
            category: item.category,
            order: item.order,
            required: item.required,
        })
        .collect();

    let template = state.checklists.upsert_template(user_id, items).await?;
    let items: Vec<TemplateItemPayload> = template.items.into_iter().map(to_payload).collect();
    Ok(Json(serde_json::json!({ "items": items })))
}

fn parse_user_id(user_id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(user_id).map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))
}

fn to_payload(item: TemplateItem) -> TemplateItemPayload {
    TemplateItemPayload {
        item_id: item.item_id,
        label: item.label,
        description: item.description,
        category: item.category,
        order: item.order,
        required: item.required,
    }
}
