//! Response DTOs for the HTTP API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::{FileOutcome, UploadReport, UploadStatus};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Folder listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderListResponse {
    /// Folder names, default folders first, then the rest alphabetically.
    pub folders: Vec<String>,
    /// Configured default folders.
    pub default_folders: Vec<String>,
}

/// Created folder.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedFolderResponse {
    /// Sanitized folder name.
    pub folder_name: String,
    /// Client-facing path (`<root>/<folder>`).
    pub folder_path: String,
}

/// Outcome of one uploaded file.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFileResponse {
    /// `stored` or `failed`.
    pub status: String,
    /// Name as sent by the client.
    pub original_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Name on disk (stored files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_name: Option<String>,
    /// Size in bytes (stored files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Folder the file was stored in (stored files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Failure code (failed files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Failure message (failed files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&FileOutcome> for UploadedFileResponse {
    fn from(outcome: &FileOutcome) -> Self {
        match outcome {
            FileOutcome::Stored(file) => Self {
                status: "stored".to_string(),
                original_name: file.original_name.clone(),
                mime_type: file.mime_type.clone(),
                stored_name: Some(file.stored_name.clone()),
                size: Some(file.size),
                folder: Some(file.folder.clone()),
                reason: None,
                message: None,
            },
            FileOutcome::Failed(file) => Self {
                status: "failed".to_string(),
                original_name: file.original_name.clone(),
                mime_type: file.mime_type.clone(),
                stored_name: None,
                size: None,
                folder: None,
                reason: Some(file.reason.code().to_string()),
                message: Some(file.message.clone()),
            },
        }
    }
}

/// Upload result.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Folder the files went to.
    pub folder: String,
    /// `completed` or `partially_failed`.
    pub status: String,
    /// Summary message.
    pub message: String,
    /// One entry per declared file, in request order.
    pub files: Vec<UploadedFileResponse>,
}

impl From<&UploadReport> for UploadResponse {
    fn from(report: &UploadReport) -> Self {
        let total = report.outcomes.len();
        let stored = report.stored_count();
        let (status, message) = match report.status() {
            UploadStatus::Completed => (
                "completed",
                format!("{stored} file(s) uploaded successfully"),
            ),
            UploadStatus::PartiallyFailed => (
                "partially_failed",
                format!("{stored} of {total} file(s) uploaded"),
            ),
        };

        Self {
            folder: report.folder.clone(),
            status: status.to_string(),
            message,
            files: report.outcomes.iter().map(UploadedFileResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FailedFile, FailureReason, StoredFile};

    fn sample_report() -> UploadReport {
        UploadReport {
            folder: "pictures".to_string(),
            outcomes: vec![
                FileOutcome::Stored(StoredFile {
                    original_name: "cat.jpg".to_string(),
                    stored_name: "cat-1-2.jpg".to_string(),
                    size: 42,
                    mime_type: "image/jpeg".to_string(),
                    folder: "pictures".to_string(),
                }),
                FileOutcome::Failed(FailedFile {
                    original_name: "run.exe".to_string(),
                    mime_type: "application/x-msdownload".to_string(),
                    reason: FailureReason::DisallowedType,
                    message: "File type not allowed".to_string(),
                }),
            ],
        }
    }

    #[test]
    fn test_upload_response_partial() {
        let response = UploadResponse::from(&sample_report());

        assert_eq!(response.status, "partially_failed");
        assert_eq!(response.message, "1 of 2 file(s) uploaded");
        assert_eq!(response.files[0].status, "stored");
        assert_eq!(response.files[0].stored_name.as_deref(), Some("cat-1-2.jpg"));
        assert_eq!(response.files[1].reason.as_deref(), Some("DISALLOWED_TYPE"));
    }

    #[test]
    fn test_upload_response_completed() {
        let mut report = sample_report();
        report.outcomes.pop();

        let response = UploadResponse::from(&report);
        assert_eq!(response.status, "completed");
        assert_eq!(response.message, "1 file(s) uploaded successfully");
    }

    #[test]
    fn test_uploaded_file_skips_empty_fields() {
        let response = UploadResponse::from(&sample_report());
        let json = serde_json::to_value(&response.files[1]).unwrap();

        assert!(json.get("stored_name").is_none());
        assert_eq!(json["message"], "File type not allowed");
    }
}
