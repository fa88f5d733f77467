use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::activities::models::{ActivityType, FileActivity};
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::format::format_file_size;
use crate::shared::types::PaginationQuery;

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub filename: String,
    pub filepath: String,
    pub activity_type: ActivityType,
    pub ip_address: Option<String>,
    pub file_size: Option<i64>,
    pub formatted_size: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<FileActivity> for ActivityResponseDto {
    fn from(activity: FileActivity) -> Self {
        Self {
            formatted_size: activity
                .file_size
                .map(|size| format_file_size(size.max(0) as u64)),
            id: activity.id,
            user_id: activity.user_id,
            username: activity.username,
            filename: activity.filename,
            filepath: activity.filepath,
            activity_type: activity.activity_type,
            ip_address: activity.ip_address,
            file_size: activity.file_size,
            timestamp: activity.created_at,
        }
    }
}

/// Query params for the admin activity log
#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityListQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page (default: 10, max: 100)
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub activity_type: Option<ActivityType>,
    pub user_id: Option<Uuid>,
    /// Substring matched against filename, path and username
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl ActivityListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}
