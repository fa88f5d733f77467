use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, ClientAddr};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    BrowseResponseDto, CreateFolderRequestDto, CreateFolderResponseDto, DeleteRequestDto,
    DeleteResponseDto, FilePreviewDto, SearchQuery, SearchResultDto, UploadFormDto,
    UploadProgressDto, UploadResponseDto,
};
use crate::features::files::models::UploadStatus;
use crate::features::files::services::FileService;
use crate::modules::storage::LogicalPath;
use crate::shared::format::format_file_size;
use crate::shared::types::{ApiResponse, Meta};

/// Browse the storage root
#[utoipa::path(
    get,
    path = "/api/browser",
    responses(
        (status = 200, description = "Folder listing", body = ApiResponse<BrowseResponseDto>),
        (status = 403, description = "No read grant on this folder")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn browse_root(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<BrowseResponseDto>>> {
    let listing = service.browse(&user, "").await?;
    Ok(Json(ApiResponse::success(Some(listing), None, None)))
}

/// Browse a folder
///
/// Missing folders inside a readable subtree are created on first access.
#[utoipa::path(
    get,
    path = "/api/browser/{path}",
    params(("path" = String, Path, description = "Folder path relative to the storage root")),
    responses(
        (status = 200, description = "Folder listing", body = ApiResponse<BrowseResponseDto>),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "No read grant on this folder")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn browse(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<BrowseResponseDto>>> {
    let listing = service.browse(&user, &path).await?;
    Ok(Json(ApiResponse::success(Some(listing), None, None)))
}

/// Upload one or more files
///
/// Files are streamed to disk in order. The first failure stops the batch;
/// files stored before it are kept.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = UploadFormDto, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Files uploaded", body = ApiResponse<UploadResponseDto>),
        (status = 400, description = "Malformed form, invalid filename or session id too long"),
        (status = 403, description = "No write grant on the target folder"),
        (status = 409, description = "Upload session id already in use"),
        (status = 500, description = "A file could not be stored")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn upload_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    ClientAddr(ip_address): ClientAddr,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponseDto>>> {
    let mut folder: Option<LogicalPath> = None;
    let mut session_id: Option<String> = None;
    let mut session_started = false;
    let mut total_files: i32 = 0;
    let mut total_size: i64 = 0;
    let mut uploaded = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "folder_path" => {
                let raw = read_text(field).await?;
                folder = Some(service.authorize_upload(&user, &raw).await?);
            }
            "session_id" => {
                let raw = read_text(field).await?;
                session_id = Some(raw.trim().to_string()).filter(|s| !s.is_empty());
            }
            "total_files" => total_files = read_number(field).await?,
            "total_size" => total_size = read_number(field).await?,
            "files" => {
                let target = folder.as_ref().ok_or_else(|| {
                    AppError::BadRequest("folder_path must be sent before files".to_string())
                })?;
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("File part has no filename".to_string()))?;

                if let (Some(id), false) = (session_id.as_deref(), session_started) {
                    service
                        .start_session(&user, target, id, total_files, total_size)
                        .await?;
                    session_started = true;
                }
                let active_session = session_id.as_deref().filter(|_| session_started);

                let stored = service
                    .store_upload(
                        &user,
                        target,
                        &filename,
                        Box::pin(field),
                        ip_address.clone(),
                        active_session,
                    )
                    .await;

                match stored {
                    Ok(file) => uploaded.push(file),
                    Err(e) => {
                        if let Some(id) = active_session {
                            service.finish_session(&user, id, UploadStatus::Failed).await;
                        }
                        return Err(e);
                    }
                }
            }
            _ => debug!("Ignoring unknown field: {}", field_name),
        }
    }

    let folder =
        folder.ok_or_else(|| AppError::BadRequest("folder_path is required".to_string()))?;

    if let Some(id) = session_id.as_deref() {
        if !session_started {
            service
                .start_session(&user, &folder, id, total_files, total_size)
                .await?;
        }
        service.finish_session(&user, id, UploadStatus::Completed).await;
    }

    let batch_size: u64 = uploaded.iter().map(|f| f.size).sum();
    tracing::info!(
        "{} uploaded {} file(s) to {}",
        user.username,
        uploaded.len(),
        folder
    );

    Ok(Json(ApiResponse::success(
        Some(UploadResponseDto {
            session_id,
            uploaded_files: uploaded,
            total_size: batch_size,
            formatted_total_size: format_file_size(batch_size),
        }),
        None,
        None,
    )))
}

async fn read_text(field: Field<'_>) -> Result<String> {
    let name = field.name().unwrap_or("").to_string();
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

async fn read_number<T: std::str::FromStr>(field: Field<'_>) -> Result<T> {
    let name = field.name().unwrap_or("").to_string();
    let raw = read_text(field).await?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a number", name)))
}

/// Poll the progress of an upload session
#[utoipa::path(
    get,
    path = "/api/upload/progress/{session_id}",
    params(("session_id" = String, Path, description = "Session id sent with the upload")),
    responses(
        (status = 200, description = "Session progress", body = ApiResponse<UploadProgressDto>),
        (status = 404, description = "No such session for this user")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn upload_progress(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<UploadProgressDto>>> {
    let progress = service.upload_progress(&user, &session_id).await?;
    Ok(Json(ApiResponse::success(Some(progress), None, None)))
}

/// Download a file
#[utoipa::path(
    get,
    path = "/api/download/{path}",
    params(("path" = String, Path, description = "File path relative to the storage root")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 403, description = "No read grant on the containing folder"),
        (status = 404, description = "File not found")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn download_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    ClientAddr(ip_address): ClientAddr,
    Path(path): Path<String>,
) -> Result<Response> {
    let opened = service.download(&user, &path, ip_address).await?;
    let disposition = content_disposition(&opened.name);
    let content_type = opened.content_type.clone();
    let size = opened.size;

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(opened.into_stream()))
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {}", e)))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

/// File details without content
#[utoipa::path(
    get,
    path = "/api/preview/{path}",
    params(("path" = String, Path, description = "File path relative to the storage root")),
    responses(
        (status = 200, description = "File details", body = ApiResponse<FilePreviewDto>),
        (status = 403, description = "No read grant on the containing folder"),
        (status = 404, description = "File not found")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn preview_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    ClientAddr(ip_address): ClientAddr,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<FilePreviewDto>>> {
    let preview = service.preview(&user, &path, ip_address).await?;
    Ok(Json(ApiResponse::success(Some(preview), None, None)))
}

/// Delete a file or an empty folder
#[utoipa::path(
    post,
    path = "/api/delete",
    request_body = DeleteRequestDto,
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<DeleteResponseDto>),
        (status = 403, description = "No admin grant on the containing folder"),
        (status = 404, description = "File/folder not found"),
        (status = 409, description = "Folder is not empty")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn delete_item(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    ClientAddr(ip_address): ClientAddr,
    AppJson(dto): AppJson<DeleteRequestDto>,
) -> Result<Json<ApiResponse<DeleteResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let deleted = service.delete(&user, &dto.path, ip_address).await?;
    Ok(Json(ApiResponse::success(Some(deleted), None, None)))
}

/// Search filenames in every readable folder
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching files", body = ApiResponse<Vec<SearchResultDto>>)
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn search_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SearchResultDto>>>> {
    let results = service
        .search(&user, &query.q, query.file_type.as_deref())
        .await?;
    let total = results.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(results),
        None,
        Some(Meta { total }),
    )))
}

/// Create a sub-folder
#[utoipa::path(
    post,
    path = "/api/create-folder",
    request_body = CreateFolderRequestDto,
    responses(
        (status = 200, description = "Folder created or already present", body = ApiResponse<CreateFolderResponseDto>),
        (status = 400, description = "Invalid folder name"),
        (status = 403, description = "No write grant on the parent folder")
    ),
    tag = "files",
    security(("bearer_auth" = []))
)]
pub async fn create_folder(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<CreateFolderRequestDto>,
) -> Result<Json<ApiResponse<CreateFolderResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = service
        .create_folder(&user, &dto.folder_path, &dto.folder_name)
        .await?;
    Ok(Json(ApiResponse::success(Some(created), None, None)))
}
