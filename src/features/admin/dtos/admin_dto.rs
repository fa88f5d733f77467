use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::permissions::{FolderPermission, PermissionLevel};
use crate::features::users::dtos::UserResponseDto;
use crate::modules::storage::{FolderSummary, TreeNode};

// =============================================================================
// FOLDER BROWSER
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct FolderQuery {
    /// Folder to start from (default: storage root)
    #[serde(default)]
    pub path: String,
}

/// One level of the admin folder picker
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderPickerDto {
    pub name: String,
    pub path: String,
    pub has_children: bool,
}

impl From<FolderSummary> for FolderPickerDto {
    fn from(folder: FolderSummary) -> Self {
        Self {
            name: folder.name,
            path: folder.path.to_string(),
            has_children: folder.has_children,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderTreeNodeDto {
    pub name: String,
    pub path: String,
    #[schema(no_recursion)]
    pub children: Vec<FolderTreeNodeDto>,
}

impl From<TreeNode> for FolderTreeNodeDto {
    fn from(node: TreeNode) -> Self {
        Self {
            name: node.name,
            path: node.path.to_string(),
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub folder_path: String,
    pub permission: PermissionLevel,
}

impl From<FolderPermission> for PermissionDto {
    fn from(permission: FolderPermission) -> Self {
        Self {
            id: permission.id,
            user_id: permission.user_id,
            folder_path: permission.folder_path,
            permission: permission.permission,
        }
    }
}

/// Account row for the admin user list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminUserDto {
    pub user: UserResponseDto,
    pub permissions: Vec<PermissionDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequestDto {
    #[validate(
        length(min = 3, max = 150, message = "Username must be 3-150 characters"),
        regex(
            path = *crate::shared::validation::USERNAME_REGEX,
            message = "Username must start with a letter or underscore and contain only letters, digits, '.', '-' or '_'"
        )
    )]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 100, message = "Vessel name must be at most 100 characters"))]
    #[serde(default)]
    pub vessel_name: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Optional first grant, applied together with `permission`
    pub folder_path: Option<String>,
    pub permission: Option<PermissionLevel>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequestDto {
    pub is_active: bool,
}

/// Shortcut actions from the user list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Admin grant on the storage root
    GrantFullAccess,
    /// Read grant on the storage root
    GrantReadAccess,
    /// Force a password change on next login
    ResetPasswordRequired,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserActionRequestDto {
    pub action: UserAction,
}

// =============================================================================
// GRANTS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GrantRequestDto {
    #[validate(length(min = 1, max = 1000, message = "folder_path must be 1-1000 characters"))]
    pub folder_path: String,
    pub permission: PermissionLevel,
}
