use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::permissions::models::{FolderPermission, PermissionLevel};
use crate::features::permissions::repositories::PermissionRepository;
use crate::modules::storage::LogicalPath;

/// A grant with its folder already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub folder: LogicalPath,
    pub level: PermissionLevel,
}

/// True when any grant covering `path` is at least `required`
pub fn grants_allow(grants: &[Grant], path: &LogicalPath, required: PermissionLevel) -> bool {
    grants
        .iter()
        .any(|grant| grant.level >= required && path.is_within(&grant.folder))
}

/// Authorization engine over the stored folder grants
pub struct PermissionService {
    repository: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    pub fn new(repository: Arc<dyn PermissionRepository>) -> Self {
        Self { repository }
    }

    /// Grants that apply to `user`; administrators get a single root admin grant
    pub async fn effective_permissions(&self, user: &AuthenticatedUser) -> Result<Vec<Grant>> {
        if user.is_admin {
            return Ok(vec![Grant {
                folder: LogicalPath::root(),
                level: PermissionLevel::Admin,
            }]);
        }

        let stored = self.repository.list_for_user(user.user_id).await?;
        let grants = stored
            .into_iter()
            .filter_map(|p| match LogicalPath::parse(&p.folder_path) {
                Ok(folder) => Some(Grant {
                    folder,
                    level: p.permission,
                }),
                Err(_) => {
                    tracing::warn!(
                        "Ignoring grant {} with invalid folder path {:?}",
                        p.id,
                        p.folder_path
                    );
                    None
                }
            })
            .collect();

        Ok(grants)
    }

    pub async fn authorize(
        &self,
        user: &AuthenticatedUser,
        path: &LogicalPath,
        required: PermissionLevel,
    ) -> Result<bool> {
        if user.is_admin {
            return Ok(true);
        }

        let grants = self.effective_permissions(user).await?;
        Ok(grants_allow(&grants, path, required))
    }

    /// Like [`authorize`](Self::authorize) but turns a denial into `403`
    pub async fn require(
        &self,
        user: &AuthenticatedUser,
        path: &LogicalPath,
        required: PermissionLevel,
    ) -> Result<()> {
        if self.authorize(user, path, required).await? {
            Ok(())
        } else {
            tracing::info!(
                "Denied {} access to {} for user {}",
                required,
                path,
                user.username
            );
            Err(AppError::permission_denied())
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FolderPermission>> {
        self.repository.list_for_user(user_id).await
    }

    /// Store a grant under its normalized folder path
    pub async fn upsert_grant(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        let folder = LogicalPath::parse(folder_path)?;
        self.repository.upsert(user_id, folder.as_str(), level).await
    }

    /// Root grant that leaves an existing root grant untouched
    pub async fn ensure_root_grant(
        &self,
        user_id: Uuid,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        self.repository
            .get_or_create(user_id, LogicalPath::root().as_str(), level)
            .await
    }

    pub async fn revoke(&self, id: Uuid) -> Result<()> {
        if self.repository.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Permission not found".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{admin_user, vessel_user, InMemoryPermissionRepository};

    fn grant(folder: &str, level: PermissionLevel) -> Grant {
        Grant {
            folder: LogicalPath::parse(folder).unwrap(),
            level,
        }
    }

    fn path(raw: &str) -> LogicalPath {
        LogicalPath::parse(raw).unwrap()
    }

    #[test]
    fn test_higher_level_implies_lower() {
        let grants = vec![grant("/vesselA", PermissionLevel::Write)];
        let target = path("/vesselA/reports");

        assert!(grants_allow(&grants, &target, PermissionLevel::Write));
        assert!(grants_allow(&grants, &target, PermissionLevel::Read));
        assert!(!grants_allow(&grants, &target, PermissionLevel::Admin));
    }

    #[test]
    fn test_root_grant_covers_everything() {
        let grants = vec![grant("/", PermissionLevel::Read)];

        assert!(grants_allow(&grants, &path("/"), PermissionLevel::Read));
        assert!(grants_allow(&grants, &path("/any/deep/path"), PermissionLevel::Read));
        assert!(!grants_allow(&grants, &path("/any"), PermissionLevel::Write));
    }

    #[test]
    fn test_sibling_folders_are_isolated() {
        let grants = vec![grant("/vesselA", PermissionLevel::Admin)];

        assert!(!grants_allow(&grants, &path("/vesselB"), PermissionLevel::Read));
        assert!(!grants_allow(&grants, &path("/vesselAB"), PermissionLevel::Read));
        assert!(!grants_allow(&grants, &path("/"), PermissionLevel::Read));
    }

    #[test]
    fn test_any_matching_grant_suffices() {
        let grants = vec![
            grant("/vesselA", PermissionLevel::Read),
            grant("/vesselA/uploads", PermissionLevel::Write),
        ];

        assert!(grants_allow(&grants, &path("/vesselA/uploads/x"), PermissionLevel::Write));
        assert!(!grants_allow(&grants, &path("/vesselA/other"), PermissionLevel::Write));
    }

    #[tokio::test]
    async fn test_authorize_uses_stored_grants() {
        let repository = Arc::new(InMemoryPermissionRepository::default());
        let service = PermissionService::new(repository.clone());
        let user = vessel_user("vessel_a");

        assert!(!service
            .authorize(&user, &path("/vesselA"), PermissionLevel::Read)
            .await
            .unwrap());

        service
            .upsert_grant(user.user_id, "vesselA/", PermissionLevel::Read)
            .await
            .unwrap();

        assert!(service
            .authorize(&user, &path("/vesselA/docs"), PermissionLevel::Read)
            .await
            .unwrap());
        assert!(matches!(
            service
                .require(&user, &path("/vesselB"), PermissionLevel::Read)
                .await,
            Err(AppError::Forbidden(_))
        ));

        let stored = service.list_for_user(user.user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].folder_path, "/vesselA");
    }

    #[tokio::test]
    async fn test_upsert_replaces_level() {
        let service = PermissionService::new(Arc::new(InMemoryPermissionRepository::default()));
        let user = vessel_user("vessel_a");

        service
            .upsert_grant(user.user_id, "/vesselA", PermissionLevel::Read)
            .await
            .unwrap();
        service
            .upsert_grant(user.user_id, "/vesselA", PermissionLevel::Admin)
            .await
            .unwrap();

        let stored = service.list_for_user(user.user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].permission, PermissionLevel::Admin);
    }

    #[tokio::test]
    async fn test_ensure_root_grant_keeps_existing_level() {
        let service = PermissionService::new(Arc::new(InMemoryPermissionRepository::default()));
        let user = vessel_user("vessel_a");

        service
            .ensure_root_grant(user.user_id, PermissionLevel::Admin)
            .await
            .unwrap();
        let again = service
            .ensure_root_grant(user.user_id, PermissionLevel::Read)
            .await
            .unwrap();

        assert_eq!(again.permission, PermissionLevel::Admin);
    }

    #[tokio::test]
    async fn test_admin_is_always_authorized() {
        let service = PermissionService::new(Arc::new(InMemoryPermissionRepository::default()));
        let admin = admin_user();

        assert!(service
            .authorize(&admin, &path("/vesselB/secret"), PermissionLevel::Admin)
            .await
            .unwrap());

        let effective = service.effective_permissions(&admin).await.unwrap();
        assert_eq!(effective, vec![grant("/", PermissionLevel::Admin)]);
    }

    #[tokio::test]
    async fn test_revoke_missing_grant() {
        let service = PermissionService::new(Arc::new(InMemoryPermissionRepository::default()));

        assert!(matches!(
            service.revoke(Uuid::now_v7()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
