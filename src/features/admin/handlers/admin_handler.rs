use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::activities::dtos::{ActivityListQuery, ActivityResponseDto};
use crate::features::admin::dtos::*;
use crate::features::admin::services::AdminService;
use crate::features::auth::guards::RequireAdmin;
use crate::shared::types::{ApiResponse, Meta};

// =============================================================================
// FOLDERS
// =============================================================================

/// List the immediate sub-folders of a folder
#[utoipa::path(
    get,
    path = "/api/admin/folder-browser",
    params(FolderQuery),
    responses(
        (status = 200, description = "Sub-folders of the folder", body = ApiResponse<Vec<FolderPickerDto>>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Path does not exist")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn folder_browser(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Query(params): Query<FolderQuery>,
) -> Result<Json<ApiResponse<Vec<FolderPickerDto>>>> {
    let folders = service.folder_browser(&params.path).await?;
    Ok(Json(ApiResponse::success(Some(folders), None, None)))
}

/// Recursive folder tree
#[utoipa::path(
    get,
    path = "/api/admin/get-folders",
    params(FolderQuery),
    responses(
        (status = 200, description = "Folder tree", body = ApiResponse<Vec<FolderTreeNodeDto>>),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_folders(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Query(params): Query<FolderQuery>,
) -> Result<Json<ApiResponse<Vec<FolderTreeNodeDto>>>> {
    let tree = service.folder_tree(&params.path).await?;
    Ok(Json(ApiResponse::success(Some(tree), None, None)))
}

// =============================================================================
// USERS
// =============================================================================

/// List all accounts with their grants
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Accounts", body = ApiResponse<Vec<AdminUserDto>>),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
) -> Result<Json<ApiResponse<Vec<AdminUserDto>>>> {
    let users = service.list_users().await?;
    let total = users.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(users),
        None,
        Some(Meta { total }),
    )))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequestDto,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<AdminUserDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 409, description = "Username already exists")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    AppJson(dto): AppJson<CreateUserRequestDto>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = service.create_user(dto).await?;
    tracing::info!("{} created user {}", admin.username, user.user.username);

    Ok(Json(ApiResponse::success(
        Some(user),
        Some("User created".to_string()),
        None,
    )))
}

/// Activate or deactivate an account
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/active",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetActiveRequestDto,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<AdminUserDto>),
        (status = 400, description = "Cannot deactivate own account"),
        (status = 404, description = "User not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_user_active(
    RequireAdmin(admin): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<SetActiveRequestDto>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    let user = service.set_user_active(&admin, id, dto.is_active).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Apply a quick action to an account
#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/actions",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserActionRequestDto,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<AdminUserDto>),
        (status = 404, description = "User not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn user_action(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UserActionRequestDto>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    let (user, message) = service.apply_action(id, dto.action).await?;
    Ok(Json(ApiResponse::success(Some(user), Some(message), None)))
}

// =============================================================================
// GRANTS
// =============================================================================

/// List an account's folder grants
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/permissions",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Grants", body = ApiResponse<Vec<PermissionDto>>),
        (status = 404, description = "User not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_user_permissions(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PermissionDto>>>> {
    let grants = service.list_user_permissions(id).await?;
    Ok(Json(ApiResponse::success(Some(grants), None, None)))
}

/// Create or replace the grant on one folder
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/permissions",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantRequestDto,
    responses(
        (status = 200, description = "Grant stored", body = ApiResponse<PermissionDto>),
        (status = 400, description = "Invalid folder path"),
        (status = 404, description = "User not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upsert_user_permission(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<GrantRequestDto>,
) -> Result<Json<ApiResponse<PermissionDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let grant = service.upsert_user_permission(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(grant), None, None)))
}

/// Revoke a grant
#[utoipa::path(
    delete,
    path = "/api/admin/permissions/{id}",
    params(("id" = Uuid, Path, description = "Grant ID")),
    responses(
        (status = 200, description = "Grant revoked"),
        (status = 404, description = "Permission not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn revoke_permission(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.revoke_permission(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Permission revoked".to_string()),
        None,
    )))
}

// =============================================================================
// ACTIVITY LOG
// =============================================================================

/// File activity log (paginated, newest first)
#[utoipa::path(
    get,
    path = "/api/admin/activities",
    params(ActivityListQuery),
    responses(
        (status = 200, description = "Activities", body = ApiResponse<Vec<ActivityResponseDto>>),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_activities(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminService>>,
    Query(params): Query<ActivityListQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityResponseDto>>>> {
    let (items, total) = service.list_activities(&params).await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}
