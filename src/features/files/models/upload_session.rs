use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Upload status matching the `upload_status` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "upload_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Completed,
    Failed,
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Database model for upload_sessions
#[derive(Debug, Clone, FromRow)]
pub struct UploadSession {
    pub session_id: String,
    pub user_id: Uuid,
    pub folder_path: String,
    pub total_files: i32,
    pub completed_files: i32,
    pub total_size: i64,
    pub uploaded_size: i64,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    /// Completed share of the batch in percent; 0 when the total is unknown
    pub fn progress(&self) -> f64 {
        if self.total_files > 0 {
            f64::from(self.completed_files) / f64::from(self.total_files) * 100.0
        } else {
            0.0
        }
    }
}

/// Data for starting an upload session
#[derive(Debug, Clone)]
pub struct NewUploadSession {
    pub session_id: String,
    pub user_id: Uuid,
    pub folder_path: String,
    pub total_files: i32,
    pub total_size: i64,
}
