use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    services::upload_service::{self, StoredFile},
};

const MAX_BATCH_FILES: usize = 10;

pub async fn upload_single(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredFile>)> {
    let file = upload_service::read_files(&mut multipart, &["file", "image"], 1)
        .await?
        .pop()
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let stored = upload_service::store_upload(&state.uploads, file).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn upload_multiple(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<StoredFile>>)> {
    let files = upload_service::read_files(&mut multipart, &["images"], MAX_BATCH_FILES).await?;

    if files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let stored = upload_service::store_batch(&state.uploads, files).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}
