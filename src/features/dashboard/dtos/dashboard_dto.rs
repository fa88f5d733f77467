use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::activities::dtos::ActivityResponseDto;
use crate::features::permissions::PermissionLevel;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessibleFolderDto {
    pub name: String,
    pub path: String,
    pub permission: PermissionLevel,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardDto {
    /// Granted folders that currently exist on disk
    pub accessible_folders: Vec<AccessibleFolderDto>,
    /// The caller's last activities, newest first
    pub recent_activities: Vec<ActivityResponseDto>,
    pub password_change_required: bool,
}
