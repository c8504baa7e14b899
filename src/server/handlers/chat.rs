use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::ChatMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQueryRequest {
    /// `query` kept as an accepted alias for older clients.
    #[serde(alias = "query")]
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// POST /api/chat — answer a question grounded in the indexed documents.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .pipeline
        .answer(&payload.question, &payload.history)
        .await?;

    Ok(Json(json!({
        "answer": result.answer,
        "sources": result.sources,
    })))
}
