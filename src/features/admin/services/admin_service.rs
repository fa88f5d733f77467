use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::activities::dtos::{ActivityListQuery, ActivityResponseDto};
use crate::features::activities::models::ActivityFilter;
use crate::features::activities::ActivityService;
use crate::features::admin::dtos::*;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::permissions::{PermissionLevel, PermissionService};
use crate::features::users::dtos::UserResponseDto;
use crate::features::users::models::User;
use crate::features::users::services::CreateUser;
use crate::features::users::UserService;
use crate::modules::storage::{LocalStorage, LogicalPath};

/// Service for administrator-only views and account management
pub struct AdminService {
    storage: Arc<LocalStorage>,
    permissions: Arc<PermissionService>,
    users: Arc<UserService>,
    activities: Arc<ActivityService>,
}

impl AdminService {
    pub fn new(
        storage: Arc<LocalStorage>,
        permissions: Arc<PermissionService>,
        users: Arc<UserService>,
        activities: Arc<ActivityService>,
    ) -> Self {
        Self {
            storage,
            permissions,
            users,
            activities,
        }
    }

    // =========================================================================
    // FOLDERS
    // =========================================================================

    pub async fn folder_browser(&self, path: &str) -> Result<Vec<FolderPickerDto>> {
        let folder = LogicalPath::parse(path)?;
        let folders = self.storage.list_folders(&folder).await?;
        Ok(folders.into_iter().map(FolderPickerDto::from).collect())
    }

    pub async fn folder_tree(&self, path: &str) -> Result<Vec<FolderTreeNodeDto>> {
        let start = LogicalPath::parse(path)?;
        let tree = self.storage.build_tree(&start).await?;
        Ok(tree.into_iter().map(FolderTreeNodeDto::from).collect())
    }

    // =========================================================================
    // USERS
    // =========================================================================

    pub async fn list_users(&self) -> Result<Vec<AdminUserDto>> {
        let users = self.users.list().await?;
        let mut items = Vec::with_capacity(users.len());
        for user in users {
            items.push(self.to_admin_user(user).await?);
        }
        Ok(items)
    }

    /// Create an account, optionally with its first folder grant
    pub async fn create_user(&self, dto: CreateUserRequestDto) -> Result<AdminUserDto> {
        let initial_grant = match (dto.folder_path, dto.permission) {
            (Some(folder_path), Some(level)) => Some((LogicalPath::parse(&folder_path)?, level)),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "folder_path and permission must be given together".to_string(),
                ))
            }
        };

        let user = self
            .users
            .create_user(CreateUser {
                username: dto.username.trim().to_string(),
                password: dto.password,
                is_admin: dto.is_admin,
                vessel_name: dto.vessel_name.trim().to_string(),
            })
            .await?;

        if let Some((folder, level)) = initial_grant {
            self.permissions
                .upsert_grant(user.id, folder.as_str(), level)
                .await?;
        }

        self.to_admin_user(user).await
    }

    pub async fn set_user_active(
        &self,
        admin: &AuthenticatedUser,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<AdminUserDto> {
        if admin.user_id == user_id && !is_active {
            return Err(AppError::BadRequest(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let user = self.users.set_active(user_id, is_active).await?;
        tracing::info!(
            "{} set active={} for user {}",
            admin.username,
            is_active,
            user.username
        );
        self.to_admin_user(user).await
    }

    /// Apply a quick action and return the updated account with a summary message
    pub async fn apply_action(
        &self,
        user_id: Uuid,
        action: UserAction,
    ) -> Result<(AdminUserDto, String)> {
        let user = self.users.get(user_id).await?;

        let message = match action {
            UserAction::GrantFullAccess => {
                self.permissions
                    .ensure_root_grant(user.id, PermissionLevel::Admin)
                    .await?;
                format!("Granted full access to {}", user.username)
            }
            UserAction::GrantReadAccess => {
                self.permissions
                    .ensure_root_grant(user.id, PermissionLevel::Read)
                    .await?;
                format!("Granted read access to {}", user.username)
            }
            UserAction::ResetPasswordRequired => {
                self.users.require_password_change(user.id).await?;
                format!("{} must change password on next login", user.username)
            }
        };

        Ok((self.to_admin_user(user).await?, message))
    }

    // =========================================================================
    // GRANTS
    // =========================================================================

    pub async fn list_user_permissions(&self, user_id: Uuid) -> Result<Vec<PermissionDto>> {
        self.users.get(user_id).await?;
        let grants = self.permissions.list_for_user(user_id).await?;
        Ok(grants.into_iter().map(PermissionDto::from).collect())
    }

    pub async fn upsert_user_permission(
        &self,
        user_id: Uuid,
        dto: GrantRequestDto,
    ) -> Result<PermissionDto> {
        self.users.get(user_id).await?;
        let grant = self
            .permissions
            .upsert_grant(user_id, &dto.folder_path, dto.permission)
            .await?;
        Ok(PermissionDto::from(grant))
    }

    pub async fn revoke_permission(&self, id: Uuid) -> Result<()> {
        self.permissions.revoke(id).await
    }

    // =========================================================================
    // ACTIVITY LOG
    // =========================================================================

    pub async fn list_activities(
        &self,
        query: &ActivityListQuery,
    ) -> Result<(Vec<ActivityResponseDto>, i64)> {
        let filter = ActivityFilter {
            activity_type: query.activity_type,
            user_id: query.user_id,
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        };

        let (items, total) = self.activities.list(&filter, &query.pagination()).await?;
        Ok((
            items.into_iter().map(ActivityResponseDto::from).collect(),
            total,
        ))
    }

    async fn to_admin_user(&self, user: User) -> Result<AdminUserDto> {
        let permissions = self
            .permissions
            .list_for_user(user.id)
            .await?
            .into_iter()
            .map(PermissionDto::from)
            .collect();
        let profile = self.users.profile(user.id).await?;

        Ok(AdminUserDto {
            user: UserResponseDto::new(user, profile),
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::activities::models::{ActivityType, NewActivity};
    use crate::shared::test_helpers::{
        admin_user, InMemoryActivityRepository, InMemoryPermissionRepository,
        InMemoryUserRepository, TEST_BCRYPT_COST,
    };
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        service: AdminService,
        activities: Arc<ActivityService>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("vesselA/docs")).unwrap();
        std::fs::create_dir_all(dir.path().join("vesselB")).unwrap();

        let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());
        let permissions = Arc::new(PermissionService::new(Arc::new(
            InMemoryPermissionRepository::default(),
        )));
        let users = Arc::new(UserService::new(
            Arc::new(InMemoryUserRepository::default()),
            TEST_BCRYPT_COST,
        ));
        let activities = Arc::new(ActivityService::new(Arc::new(
            InMemoryActivityRepository::default(),
        )));

        Fixture {
            _dir: dir,
            service: AdminService::new(storage, permissions, users, Arc::clone(&activities)),
            activities,
        }
    }

    fn create_request(username: &str) -> CreateUserRequestDto {
        CreateUserRequestDto {
            username: username.to_string(),
            password: "initial-pass".to_string(),
            vessel_name: "MV Alpha".to_string(),
            is_admin: false,
            folder_path: Some("/vesselA".to_string()),
            permission: Some(PermissionLevel::Write),
        }
    }

    #[tokio::test]
    async fn test_folder_browser_lists_one_level() {
        let f = fixture();
        let folders = f.service.folder_browser("").await.unwrap();

        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["vesselA", "vesselB"]);
        assert!(folders[0].has_children);
        assert!(!folders[1].has_children);
    }

    #[tokio::test]
    async fn test_folder_browser_missing_path_is_not_found() {
        let f = fixture();
        let err = f.service.folder_browser("/nowhere").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_folder_tree_is_recursive() {
        let f = fixture();
        let tree = f.service.folder_tree("/").await.unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].path, "/vesselA/docs");
    }

    #[tokio::test]
    async fn test_create_user_with_initial_grant() {
        let f = fixture();
        let created = f.service.create_user(create_request("vessel_a")).await.unwrap();

        assert_eq!(created.user.vessel_name, "MV Alpha");
        assert!(!created.user.password_changed);
        assert_eq!(created.permissions.len(), 1);
        assert_eq!(created.permissions[0].folder_path, "/vesselA");
        assert_eq!(created.permissions[0].permission, PermissionLevel::Write);

        let all = f.service.list_users().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_requires_complete_grant() {
        let f = fixture();
        let mut request = create_request("vessel_a");
        request.permission = None;

        let err = f.service.create_user(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_user_conflicts() {
        let f = fixture();
        f.service.create_user(create_request("vessel_a")).await.unwrap();
        let err = f
            .service
            .create_user(create_request("vessel_a"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_self() {
        let f = fixture();
        let admin = admin_user();
        let err = f
            .service
            .set_user_active(&admin, admin.user_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_set_user_active() {
        let f = fixture();
        let created = f.service.create_user(create_request("vessel_a")).await.unwrap();

        let updated = f
            .service
            .set_user_active(&admin_user(), created.user.id, false)
            .await
            .unwrap();
        assert!(!updated.user.is_active);
    }

    #[tokio::test]
    async fn test_quick_actions_keep_existing_root_grant() {
        let f = fixture();
        let created = f.service.create_user(create_request("vessel_a")).await.unwrap();
        let id = created.user.id;

        let (user, _) = f
            .service
            .apply_action(id, UserAction::GrantReadAccess)
            .await
            .unwrap();
        assert!(user
            .permissions
            .iter()
            .any(|p| p.folder_path == "/" && p.permission == PermissionLevel::Read));

        // An existing root grant is left as it is
        let (user, _) = f
            .service
            .apply_action(id, UserAction::GrantFullAccess)
            .await
            .unwrap();
        let root: Vec<_> = user
            .permissions
            .iter()
            .filter(|p| p.folder_path == "/")
            .collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].permission, PermissionLevel::Read);
    }

    #[tokio::test]
    async fn test_reset_password_required_action() {
        let f = fixture();
        let created = f.service.create_user(create_request("vessel_a")).await.unwrap();
        f.service
            .users
            .change_password(created.user.id, "new-password".to_string())
            .await
            .unwrap();

        let (user, message) = f
            .service
            .apply_action(created.user.id, UserAction::ResetPasswordRequired)
            .await
            .unwrap();
        assert!(!user.user.password_changed);
        assert!(message.contains("vessel_a"));
    }

    #[tokio::test]
    async fn test_action_on_unknown_user_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .apply_action(Uuid::new_v4(), UserAction::GrantFullAccess)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_and_revoke_permission() {
        let f = fixture();
        let created = f.service.create_user(create_request("vessel_a")).await.unwrap();
        let id = created.user.id;

        let grant = f
            .service
            .upsert_user_permission(
                id,
                GrantRequestDto {
                    folder_path: "vesselA/".to_string(),
                    permission: PermissionLevel::Admin,
                },
            )
            .await
            .unwrap();
        assert_eq!(grant.folder_path, "/vesselA");
        assert_eq!(grant.permission, PermissionLevel::Admin);
        assert_eq!(f.service.list_user_permissions(id).await.unwrap().len(), 1);

        f.service.revoke_permission(grant.id).await.unwrap();
        assert!(f.service.list_user_permissions(id).await.unwrap().is_empty());

        let err = f.service.revoke_permission(grant.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_activities_filters_by_search() {
        let f = fixture();
        let user_id = Uuid::new_v4();
        for (name, kind) in [
            ("manifest.pdf", ActivityType::Upload),
            ("crew.xlsx", ActivityType::Download),
        ] {
            f.activities
                .record(NewActivity {
                    user_id,
                    username: "vessel_a".to_string(),
                    filename: name.to_string(),
                    filepath: format!("/vesselA/{}", name),
                    activity_type: kind,
                    ip_address: None,
                    file_size: Some(10),
                })
                .await;
        }

        let query = ActivityListQuery {
            page: 1,
            page_size: 10,
            activity_type: None,
            user_id: None,
            search: Some(" MANIFEST ".to_string()),
        };
        let (items, total) = f.service.list_activities(&query).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(items[0].filename, "manifest.pdf");
    }
}
