use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::activities::{dtos as activities_dtos, models as activities_models};
use crate::features::admin::{dtos as admin_dtos, handlers as admin_handlers};
use crate::features::auth;
use crate::features::dashboard::{dtos as dashboard_dtos, handlers as dashboard_handlers};
use crate::features::files::{
    dtos as files_dtos, handlers as files_handlers, models as files_models,
};
use crate::features::permissions::models as permissions_models;
use crate::features::users::dtos as users_dtos;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::login,
        auth::handlers::get_me,
        auth::handlers::change_password,
        // Dashboard
        dashboard_handlers::get_dashboard,
        // Files
        files_handlers::browse_root,
        files_handlers::browse,
        files_handlers::upload_files,
        files_handlers::upload_progress,
        files_handlers::download_file,
        files_handlers::preview_file,
        files_handlers::delete_item,
        files_handlers::search_files,
        files_handlers::create_folder,
        // Admin
        admin_handlers::folder_browser,
        admin_handlers::get_folders,
        admin_handlers::list_users,
        admin_handlers::create_user,
        admin_handlers::set_user_active,
        admin_handlers::user_action,
        admin_handlers::list_user_permissions,
        admin_handlers::upsert_user_permission,
        admin_handlers::revoke_permission,
        admin_handlers::list_activities,
    ),
    components(
        schemas(
            // Shared
            Meta,
            permissions_models::PermissionLevel,
            activities_models::ActivityType,
            activities_dtos::ActivityResponseDto,
            // Auth
            auth::dtos::LoginRequestDto,
            auth::dtos::ChangePasswordRequestDto,
            auth::dtos::AuthResponseDto,
            users_dtos::UserResponseDto,
            ApiResponse<auth::dtos::AuthResponseDto>,
            ApiResponse<users_dtos::UserResponseDto>,
            // Dashboard
            dashboard_dtos::AccessibleFolderDto,
            dashboard_dtos::DashboardDto,
            ApiResponse<dashboard_dtos::DashboardDto>,
            // Files
            files_models::UploadStatus,
            files_dtos::ItemTypeDto,
            files_dtos::BrowseItemDto,
            files_dtos::BreadcrumbDto,
            files_dtos::BrowseResponseDto,
            files_dtos::UploadFormDto,
            files_dtos::UploadedFileDto,
            files_dtos::UploadResponseDto,
            files_dtos::UploadProgressDto,
            files_dtos::FilePreviewDto,
            files_dtos::DeleteRequestDto,
            files_dtos::DeleteResponseDto,
            files_dtos::CreateFolderRequestDto,
            files_dtos::CreateFolderResponseDto,
            files_dtos::SearchResultDto,
            ApiResponse<files_dtos::BrowseResponseDto>,
            ApiResponse<files_dtos::UploadResponseDto>,
            ApiResponse<files_dtos::UploadProgressDto>,
            ApiResponse<files_dtos::FilePreviewDto>,
            ApiResponse<files_dtos::DeleteResponseDto>,
            ApiResponse<files_dtos::CreateFolderResponseDto>,
            ApiResponse<Vec<files_dtos::SearchResultDto>>,
            // Admin
            admin_dtos::FolderPickerDto,
            admin_dtos::FolderTreeNodeDto,
            admin_dtos::PermissionDto,
            admin_dtos::AdminUserDto,
            admin_dtos::CreateUserRequestDto,
            admin_dtos::SetActiveRequestDto,
            admin_dtos::UserAction,
            admin_dtos::UserActionRequestDto,
            admin_dtos::GrantRequestDto,
            ApiResponse<Vec<admin_dtos::FolderPickerDto>>,
            ApiResponse<Vec<admin_dtos::FolderTreeNodeDto>>,
            ApiResponse<Vec<admin_dtos::AdminUserDto>>,
            ApiResponse<admin_dtos::AdminUserDto>,
            ApiResponse<Vec<admin_dtos::PermissionDto>>,
            ApiResponse<admin_dtos::PermissionDto>,
            ApiResponse<Vec<activities_dtos::ActivityResponseDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Login, current account and password change"),
        (name = "Dashboard", description = "Accessible folders and recent activity"),
        (name = "files", description = "Browse, transfer and manage files inside granted folders"),
        (name = "admin", description = "Accounts, folder grants and activity log (admin only)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Vessel File Portal API",
        version = "0.1.0",
        description = "Permissioned file browser for vessel document exchange",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
