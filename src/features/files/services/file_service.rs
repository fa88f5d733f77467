use axum::body::Bytes;
use futures::Stream;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::activities::{ActivityService, ActivityType, NewActivity};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    BreadcrumbDto, BrowseItemDto, BrowseResponseDto, CreateFolderResponseDto, DeleteResponseDto,
    FilePreviewDto, SearchResultDto, UploadProgressDto, UploadedFileDto,
};
use crate::features::files::models::{NewUploadSession, UploadStatus};
use crate::features::files::repositories::UploadSessionRepository;
use crate::features::permissions::services::grants_allow;
use crate::features::permissions::{PermissionLevel, PermissionService};
use crate::modules::storage::{EntryKind, LocalStorage, LogicalPath, OpenedFile};
use crate::shared::constants::MAX_SESSION_ID_LENGTH;
use crate::shared::format::format_file_size;

/// File operations gated by folder grants.
///
/// Every operation authorizes before touching the filesystem, and every
/// successful operation on a file appends an activity record.
pub struct FileService {
    storage: Arc<LocalStorage>,
    permissions: Arc<PermissionService>,
    activities: Arc<ActivityService>,
    sessions: Arc<dyn UploadSessionRepository>,
}

impl FileService {
    pub fn new(
        storage: Arc<LocalStorage>,
        permissions: Arc<PermissionService>,
        activities: Arc<ActivityService>,
        sessions: Arc<dyn UploadSessionRepository>,
    ) -> Self {
        Self {
            storage,
            permissions,
            activities,
            sessions,
        }
    }

    /// List a folder the caller can read, with what they may do there
    pub async fn browse(&self, user: &AuthenticatedUser, raw_path: &str) -> Result<BrowseResponseDto> {
        let folder = LogicalPath::parse(raw_path)?;
        let grants = self.permissions.effective_permissions(user).await?;

        if !grants_allow(&grants, &folder, PermissionLevel::Read) {
            return Err(AppError::permission_denied());
        }

        let entries = self.storage.list(&folder).await?;

        let mut total_size = 0;
        let mut file_count = 0;
        let mut folder_count = 0;
        for entry in &entries {
            match entry.kind {
                EntryKind::File => {
                    total_size += entry.size;
                    file_count += 1;
                }
                EntryKind::Folder => folder_count += 1,
            }
        }

        let can_write = grants_allow(&grants, &folder, PermissionLevel::Write);

        Ok(BrowseResponseDto {
            current_path: folder.to_string(),
            items: entries.into_iter().map(BrowseItemDto::from).collect(),
            breadcrumbs: folder
                .breadcrumbs()
                .into_iter()
                .map(|(name, path)| BreadcrumbDto {
                    name,
                    path: path.to_string(),
                })
                .collect(),
            can_upload: can_write,
            can_delete: grants_allow(&grants, &folder, PermissionLevel::Admin),
            can_create_folder: can_write,
            total_size,
            formatted_total_size: format_file_size(total_size),
            file_count,
            folder_count,
        })
    }

    /// Parse and authorize an upload target before any file is read
    pub async fn authorize_upload(&self, user: &AuthenticatedUser, raw_folder: &str) -> Result<LogicalPath> {
        let folder = LogicalPath::parse(raw_folder)?;
        self.permissions
            .require(user, &folder, PermissionLevel::Write)
            .await?;
        Ok(folder)
    }

    pub async fn start_session(
        &self,
        user: &AuthenticatedUser,
        folder: &LogicalPath,
        session_id: &str,
        total_files: i32,
        total_size: i64,
    ) -> Result<()> {
        if session_id.chars().count() > MAX_SESSION_ID_LENGTH {
            return Err(AppError::BadRequest(format!(
                "session_id must be at most {} characters",
                MAX_SESSION_ID_LENGTH
            )));
        }

        self.sessions
            .create(NewUploadSession {
                session_id: session_id.to_string(),
                user_id: user.user_id,
                folder_path: folder.to_string(),
                total_files,
                total_size,
            })
            .await?;
        Ok(())
    }

    /// Stream one uploaded file to disk, then log it and advance the session.
    ///
    /// Errors carry the client filename so the caller can report which file
    /// of a batch failed.
    pub async fn store_upload<S, E>(
        &self,
        user: &AuthenticatedUser,
        folder: &LogicalPath,
        filename: &str,
        body: S,
        ip_address: Option<String>,
        session_id: Option<&str>,
    ) -> Result<UploadedFileDto>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let saved = self
            .storage
            .save(folder, filename, body)
            .await
            .map_err(|e| match e {
                AppError::BadRequest(msg) => {
                    AppError::BadRequest(format!("Error uploading {}: {}", filename, msg))
                }
                AppError::Io(io) => {
                    tracing::error!("Failed to store upload {} in {}: {:?}", filename, folder, io);
                    AppError::UploadFailed(format!("Error uploading {}", filename))
                }
                other => other,
            })?;

        self.activities
            .record(NewActivity {
                user_id: user.user_id,
                username: user.username.clone(),
                filename: saved.name.clone(),
                filepath: saved.path.to_string(),
                activity_type: ActivityType::Upload,
                ip_address,
                file_size: Some(saved.size as i64),
            })
            .await;

        if let Some(session_id) = session_id {
            if let Err(e) = self
                .sessions
                .record_file(session_id, user.user_id, saved.size as i64)
                .await
            {
                tracing::warn!("Failed to update upload session {}: {}", session_id, e);
            }
        }

        Ok(UploadedFileDto {
            formatted_size: format_file_size(saved.size),
            path: saved.path.to_string(),
            name: saved.name,
            size: saved.size,
        })
    }

    pub async fn finish_session(
        &self,
        user: &AuthenticatedUser,
        session_id: &str,
        status: UploadStatus,
    ) {
        if let Err(e) = self
            .sessions
            .set_status(session_id, user.user_id, status)
            .await
        {
            tracing::warn!("Failed to mark upload session {} {}: {}", session_id, status, e);
        }
    }

    pub async fn upload_progress(
        &self,
        user: &AuthenticatedUser,
        session_id: &str,
    ) -> Result<UploadProgressDto> {
        self.sessions
            .find(session_id, user.user_id)
            .await?
            .map(UploadProgressDto::from)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    /// Open a file for download; access is checked on its folder
    pub async fn download(
        &self,
        user: &AuthenticatedUser,
        raw_path: &str,
        ip_address: Option<String>,
    ) -> Result<OpenedFile> {
        let path = LogicalPath::parse(raw_path)?;
        self.permissions
            .require(user, &path.parent(), PermissionLevel::Read)
            .await?;

        let opened = self.storage.open(&path).await?;

        self.record(user, &path, &opened.name, ActivityType::Download, ip_address, opened.size)
            .await;

        Ok(opened)
    }

    pub async fn preview(
        &self,
        user: &AuthenticatedUser,
        raw_path: &str,
        ip_address: Option<String>,
    ) -> Result<FilePreviewDto> {
        let path = LogicalPath::parse(raw_path)?;
        self.permissions
            .require(user, &path.parent(), PermissionLevel::Read)
            .await?;

        let metadata = self.storage.stat(&path).await?;

        self.record(user, &path, &metadata.name, ActivityType::View, ip_address, metadata.size)
            .await;

        Ok(metadata.into())
    }

    /// Delete a file or empty folder; requires admin on the containing folder
    pub async fn delete(
        &self,
        user: &AuthenticatedUser,
        raw_path: &str,
        ip_address: Option<String>,
    ) -> Result<DeleteResponseDto> {
        let path = LogicalPath::parse(raw_path)?;
        self.permissions
            .require(user, &path.parent(), PermissionLevel::Admin)
            .await?;

        let deleted = self.storage.delete(&path).await?;
        let name = path.file_name().unwrap_or_default().to_string();

        self.record(user, &path, &name, ActivityType::Delete, ip_address, deleted.size)
            .await;

        Ok(DeleteResponseDto {
            path: path.to_string(),
            item_type: deleted.kind.into(),
            size: deleted.size,
        })
    }

    /// Filename search across every folder the caller can read
    pub async fn search(
        &self,
        user: &AuthenticatedUser,
        query: &str,
        file_type: Option<&str>,
    ) -> Result<Vec<SearchResultDto>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let roots: Vec<LogicalPath> = self
            .permissions
            .effective_permissions(user)
            .await?
            .into_iter()
            .map(|grant| grant.folder)
            .collect();

        let hits = self.storage.search(&roots, query, file_type).await?;
        Ok(hits.into_iter().map(SearchResultDto::from).collect())
    }

    pub async fn create_folder(
        &self,
        user: &AuthenticatedUser,
        raw_parent: &str,
        folder_name: &str,
    ) -> Result<CreateFolderResponseDto> {
        let parent = LogicalPath::parse(raw_parent)?;
        self.permissions
            .require(user, &parent, PermissionLevel::Write)
            .await?;

        let created = self.storage.create_folder(&parent, folder_name).await?;
        tracing::info!("{} created folder {}", user.username, created);

        Ok(CreateFolderResponseDto {
            path: created.to_string(),
        })
    }

    async fn record(
        &self,
        user: &AuthenticatedUser,
        path: &LogicalPath,
        filename: &str,
        activity_type: ActivityType,
        ip_address: Option<String>,
        size: u64,
    ) {
        self.activities
            .record(NewActivity {
                user_id: user.user_id,
                username: user.username.clone(),
                filename: filename.to_string(),
                filepath: path.to_string(),
                activity_type,
                ip_address,
                file_size: Some(size as i64),
            })
            .await;
    }
}
