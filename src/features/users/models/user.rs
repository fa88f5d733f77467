use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Database model for user_profiles
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub password_changed: bool,
    pub vessel_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a user together with its profile
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub vessel_name: String,
}
