use std::sync::Arc;

use crate::core::error::Result;
use crate::features::activities::dtos::ActivityResponseDto;
use crate::features::activities::ActivityService;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::dashboard::dtos::{AccessibleFolderDto, DashboardDto};
use crate::features::permissions::PermissionService;
use crate::features::users::UserService;
use crate::modules::storage::LocalStorage;
use crate::shared::constants::RECENT_ACTIVITY_LIMIT;

/// Service for the per-user dashboard
pub struct DashboardService {
    storage: Arc<LocalStorage>,
    permissions: Arc<PermissionService>,
    activities: Arc<ActivityService>,
    users: Arc<UserService>,
}

impl DashboardService {
    pub fn new(
        storage: Arc<LocalStorage>,
        permissions: Arc<PermissionService>,
        activities: Arc<ActivityService>,
        users: Arc<UserService>,
    ) -> Self {
        Self {
            storage,
            permissions,
            activities,
            users,
        }
    }

    pub async fn get(&self, user: &AuthenticatedUser) -> Result<DashboardDto> {
        let mut accessible_folders = Vec::new();
        for grant in self.permissions.effective_permissions(user).await? {
            if !self.storage.folder_exists(&grant.folder).await? {
                continue;
            }
            accessible_folders.push(AccessibleFolderDto {
                name: grant.folder.file_name().unwrap_or("/").to_string(),
                path: grant.folder.to_string(),
                permission: grant.level,
            });
        }

        let recent_activities = self
            .activities
            .recent_for_user(user.user_id, RECENT_ACTIVITY_LIMIT)
            .await?
            .into_iter()
            .map(ActivityResponseDto::from)
            .collect();

        let profile = self.users.profile(user.user_id).await?;

        Ok(DashboardDto {
            accessible_folders,
            recent_activities,
            password_change_required: !profile.password_changed,
        })
    }
}
