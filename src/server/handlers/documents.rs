use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::rag::{load_documents, StagedFile};
use crate::state::AppState;

/// Removes the staged upload files on every exit path, success or error.
struct TempFiles(Vec<PathBuf>);

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            if path.exists() {
                if let Err(err) = std::fs::remove_file(path) {
                    tracing::warn!("Failed to remove temporary file {:?}: {}", path, err);
                }
            }
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    base.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// POST /api/process-documents — multipart upload, chunk + embed + index.
pub async fn process_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut staged = Vec::new();
    let mut temp_files = TempFiles(Vec::new());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(sanitize_filename) else {
            continue;
        };
        if file_name.is_empty() {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("failed to read upload: {}", e)))?;

        let path = state
            .paths
            .upload_dir
            .join(format!("{}_{}", Uuid::new_v4(), file_name));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(ApiError::internal)?;

        temp_files.0.push(path.clone());
        staged.push(StagedFile {
            path,
            name: file_name,
        });
    }

    if staged.is_empty() {
        return Err(ApiError::InvalidInput("No files provided".to_string()));
    }

    let outcome = load_documents(&staged);
    tracing::info!(
        "Loaded {} documents from {} uploads ({} skipped)",
        outcome.documents.len(),
        staged.len(),
        outcome.skipped
    );

    if outcome.documents.is_empty() {
        return Err(ApiError::NoValidInput(
            "Could not process the provided documents".to_string(),
        ));
    }

    let chunk_count = state.pipeline.ingest(outcome.documents).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Documents processed successfully",
        "chunks_indexed": chunk_count,
        "files_skipped": outcome.skipped,
    })))
}
