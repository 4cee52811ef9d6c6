use std::io::ErrorKind;

use axum::{
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{content_type_for, is_safe_file_name, StorageError};

/// GET /api/v1/files/:filename
///
/// Serves an artifact written by the local store.
pub async fn handle_get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if !is_safe_file_name(&filename) {
        return Err(AppError::Validation("Invalid filename".to_string()));
    }

    let path = state.config.upload_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("File '{filename}'")));
        }
        Err(e) => return Err(StorageError::Io(e).into()),
    };

    Ok(([(CONTENT_TYPE, content_type_for(&filename))], bytes).into_response())
}
