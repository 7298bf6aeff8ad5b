use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::cycle::AlertCycle;

#[derive(Clone)]
pub struct AppState {
    pub cycle: Arc<AlertCycle>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status))
        .with_state(state)
}

/// Last cycle summary; 404 until the first cycle has finished.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    match state.cycle.last_result() {
        Some(res) => Json(res).into_response(),
        None => (StatusCode::NOT_FOUND, "no cycle has run yet").into_response(),
    }
}
