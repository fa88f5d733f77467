use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Activity type matching the `activity_type` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "activity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Upload,
    Download,
    Delete,
    View,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Upload => write!(f, "upload"),
            ActivityType::Download => write!(f, "download"),
            ActivityType::Delete => write!(f, "delete"),
            ActivityType::View => write!(f, "view"),
        }
    }
}

/// Database model for file_activities
#[derive(Debug, Clone, FromRow)]
pub struct FileActivity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub filename: String,
    pub filepath: String,
    pub activity_type: ActivityType,
    pub ip_address: Option<String>,
    pub file_size: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Data for appending an activity
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub username: String,
    pub filename: String,
    pub filepath: String,
    pub activity_type: ActivityType,
    pub ip_address: Option<String>,
    pub file_size: Option<i64>,
}

/// Filters for the admin activity listing
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub activity_type: Option<ActivityType>,
    pub user_id: Option<Uuid>,
    /// Substring matched against filename, filepath and username
    pub search: Option<String>,
}
