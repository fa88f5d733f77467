use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::users::models::{User, UserProfile};

/// Account with its profile flags; never exposes the password hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub vessel_name: String,
    pub password_changed: bool,
    pub created_at: DateTime<Utc>,
}

impl UserResponseDto {
    pub fn new(user: User, profile: UserProfile) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            is_active: user.is_active,
            vessel_name: profile.vessel_name,
            password_changed: profile.password_changed,
            created_at: user.created_at,
        }
    }
}
