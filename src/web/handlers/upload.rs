//! Upload handler.

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::file::FilePayload;
use crate::web::dto::{ApiResponse, UploadResponse};
use crate::web::error::ApiError;

/// Multipart field carrying the target folder name.
const FOLDER_FIELD: &str = "folder";

/// Multipart field name used for every file.
const FILES_FIELD: &str = "files";

/// POST /api/upload - Upload files into a folder.
///
/// Request body: multipart/form-data with a "folder" text field and one or
/// more "files" fields. Other fields are ignored. The folder field may come
/// before or after the files.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    responses(
        (status = 200, description = "Upload processed", body = UploadResponse),
        (status = 400, description = "Invalid folder, no files, too many files or broken body"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut batch = state.pipeline.begin();
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            FOLDER_FIELD => {
                folder = Some(field.text().await.map_err(|e| {
                    tracing::warn!("Failed to read folder field: {}", e);
                    ApiError::bad_request("Invalid folder field")
                })?);
            }
            FILES_FIELD => {
                let original_name = field.file_name().unwrap_or("").to_string();
                let mime_type = field.content_type().map(str::to_string);

                let mut payload = FilePayload::new(original_name, field);
                if let Some(mime_type) = mime_type {
                    payload = payload.with_mime_type(mime_type);
                }
                batch.stage(payload).await?;
            }
            _ => {}
        }
    }

    let folder = folder.unwrap_or_default();
    let report = batch.commit(&folder).await?;

    Ok(Json(ApiResponse::new(UploadResponse::from(&report))))
}
