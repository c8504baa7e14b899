use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let indexed_chunks = state.store.count(&state.settings.collection).await?;

    Ok(Json(json!({
        "collection": state.settings.collection,
        "indexed_chunks": indexed_chunks,
    })))
}
