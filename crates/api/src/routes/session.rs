use axum::{
    Json,
    extract::{Path, Query, State},
};
use bson::oid::ObjectId;
use callpilot_db::models::CallSession;
use callpilot_services::dao::base::PaginationParams;
use callpilot_services::dao::{from_template, to_session_items};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub user_id: String,
    pub meeting_url: String,
    pub client_name: Option<String>,
    pub status: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub user_id: String,
    #[validate(url)]
    pub meeting_url: String,
    pub client_name: Option<String>,
}

/// POST /api/session: creates a call session, seeds its checklist from the
/// user's template and starts the live orchestration worker.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let user_id = ObjectId::parse_str(&body.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let session = state
        .sessions
        .create(user_id, body.meeting_url.clone(), body.client_name)
        .await?;
    let session_id = session
        .id
        .ok_or_else(|| ApiError::Internal("Session id missing after insert".to_string()))?;

    let checklist_items = match state.checklists.get_template(user_id).await? {
        Some(template) => from_template(&template),
        None => {
            warn!(%user_id, "No checklist template; session starts with an empty checklist");
            Vec::new()
        }
    };

    state
        .engine
        .start_session(session_id, body.meeting_url, checklist_items);

    Ok(Json(to_response(session)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: String,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = ObjectId::parse_str(&params.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let defaults = PaginationParams::default();
    let pagination = PaginationParams {
        page: params.page.unwrap_or(defaults.page),
        per_page: params.per_page.unwrap_or(defaults.per_page),
    };

    let result = state.sessions.list_by_user(user_id, &pagination).await?;
    let items: Vec<SessionResponse> = result.items.into_iter().map(to_response).collect();

    Ok(Json(serde_json::json!({
        "items": items,
        "total": result.total,
        "page": result.page,
        "per_page": result.per_page,
        "total_pages": result.total_pages,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&session_id)?;
    let session = state.sessions.find_by_id(id).await?;
    Ok(Json(to_response(session)))
}

/// POST /api/session/{id}/end: stops the worker, flushes the final transcript
/// and checklist state, and completes the session record.
pub async fn end(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = parse_session_id(&session_id)?;

    let mut client_name = None;
    if let Some(view) = state.engine.stop_session(id).await {
        client_name = view.client_name.clone();

        // Flush whatever the fire-and-forget stores may have missed,
        // including the still-open last segment.
        for segment in &view.transcript {
            state
                .transcripts
                .upsert_segment(
                    id,
                    segment.id as i64,
                    callpilot_services::persistence::speaker_label(segment.speaker),
                    &segment.text,
                    bson::DateTime::from_chrono(segment.timestamp),
                    segment.confidence,
                )
                .await?;
        }
        state
            .checklists
            .save_session_checklist(id, to_session_items(&view.checklist))
            .await?;
    }

    state.sessions.complete(id, client_name).await?;
    let session = state.sessions.find_by_id(id).await?;
    Ok(Json(to_response(session)))
}

/// GET /api/session/{id}/prompt: the current suggestion plus the orchestrator
/// state for diagnostics.
pub async fn prompt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&session_id)?;
    let view = state
        .engine
        .view(id)
        .await
        .ok_or_else(|| ApiError::NotFound("No active session".to_string()))?;

    Ok(Json(serde_json::json!({
        "prompt": view.current_prompt,
        "state": view.state,
    })))
}

/// GET /api/session/{id}/transcript: live transcript while the session is
/// active, stored segments afterwards.
pub async fn transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&session_id)?;

    if let Some(view) = state.engine.view(id).await {
        return Ok(Json(serde_json::json!({
            "live": true,
            "segments": view.transcript,
        })));
    }

    let segments = state.transcripts.find_by_session(id).await?;
    Ok(Json(serde_json::json!({
        "live": false,
        "segments": segments,
    })))
}

/// GET /api/session/{id}/checklist: live checklist state while active, the
/// stored final state afterwards.
pub async fn checklist(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&session_id)?;

    if let Some(view) = state.engine.view(id).await {
        return Ok(Json(serde_json::json!({
            "live": true,
            "items": view.checklist,
        })));
    }

    let stored = state
        .checklists
        .get_session_checklist(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No checklist for session".to_string()))?;
    Ok(Json(serde_json::json!({
        "live": false,
        "items": stored.items,
    })))
}

/// GET /api/session/{id}/questions: the durable generated-question history.
pub async fn questions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_session_id(&session_id)?;
    let questions = state.questions.find_by_session(id).await?;
    let items: Vec<serde_json::Value> = questions
        .iter()
        .map(|q| {
            serde_json::json!({
                "prompt": q.prompt,
                "category": q.category,
                "created_at": q.created_at.try_to_rfc3339_string().unwrap_or_default(),
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "items": items })))
}

fn parse_session_id(session_id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(session_id)
        .map_err(|_| ApiError::BadRequest("Invalid session_id".to_string()))
}

fn to_response(session: CallSession) -> SessionResponse {
    SessionResponse {
        id: session.id.map(|id| id.to_hex()).unwrap_or_default(),
        user_id: session.user_id.to_hex(),
        meeting_url: session.meeting_url,
        client_name: session.client_name,
        status: match session.status {
            callpilot_db::models::SessionStatus::Active => "active".to_string(),
            callpilot_db::models::SessionStatus::Completed => "completed".to_string(),
        },
        started_at: session
            .started_at
            .try_to_rfc3339_string()
            .unwrap_or_default(),
        ended_at: session
            .ended_at
            .and_then(|at| at.try_to_rfc3339_string().ok()),
        duration_secs: session.duration_secs,
    }
}
