//! Folder handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, CreatedFolderResponse, FolderListResponse, ValidatedJson,
};
use crate::web::error::ApiError;

/// Put configured default folders first, then everything else alphabetically.
fn order_folders(defaults: &[String], listed: Vec<String>) -> Vec<String> {
    let mut ordered: Vec<String> = defaults
        .iter()
        .filter(|d| listed.contains(d))
        .cloned()
        .collect();
    let mut others: Vec<String> = listed
        .into_iter()
        .filter(|f| !defaults.contains(f))
        .collect();
    others.sort();
    ordered.extend(others);
    ordered
}

/// GET /api/folders - List upload folders.
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "folders",
    responses(
        (status = 200, description = "Folder list", body = FolderListResponse),
        (status = 500, description = "Storage root unreadable")
    )
)]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<FolderListResponse>>, ApiError> {
    let store = state.store();
    let listed = store.list_folders()?;
    let default_folders = store.default_folders().to_vec();

    Ok(Json(ApiResponse::new(FolderListResponse {
        folders: order_folders(&default_folders, listed),
        default_folders,
    })))
}

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = CreatedFolderResponse),
        (status = 400, description = "Invalid folder name"),
        (status = 409, description = "Folder already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedFolderResponse>>), ApiError> {
    let store = state.store();
    let folder = store.create_folder(&req.folder_name)?;

    let response = CreatedFolderResponse {
        folder_path: format!("{}/{}", store.root().display_name(), folder.name),
        folder_name: folder.name,
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}
