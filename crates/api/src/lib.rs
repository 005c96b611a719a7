pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Session lifecycle + live views
    let session_routes = Router::new()
        .route("/", post(routes::session::create))
        .route("/", get(routes::session::list))
        .route("/{session_id}", get(routes::session::get))
        .route("/{session_id}/end", post(routes::session::end))
        .route("/{session_id}/prompt", get(routes::session::prompt))
        .route("/{session_id}/transcript", get(routes::session::transcript))
        .route("/{session_id}/checklist", get(routes::session::checklist))
        .route("/{session_id}/questions", get(routes::session::questions))
        .route("/{session_id}/ws", get(ws::handler::ws_upgrade));

    // Checklist template CRUD
    let checklist_routes = Router::new()
        .route("/{user_id}", get(routes::checklist::get_template))
        .route("/{user_id}", put(routes::checklist::upsert_template));

    // Compose API
    let api = Router::new()
        .nest("/session", session_routes)
        .nest("/checklist", checklist_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
