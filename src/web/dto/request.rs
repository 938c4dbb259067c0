//! Request DTOs for the HTTP API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::no_control_chars;

/// Create folder request.
///
/// Blank names pass validation and are rejected by the folder store, so
/// they report the same error as every other unusable name.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Requested folder name (sanitized before use).
    #[serde(rename = "folderName", default)]
    #[validate(
        length(max = 255, message = "Folder name is too long"),
        custom(function = "no_control_chars")
    )]
    pub folder_name: String,
}
