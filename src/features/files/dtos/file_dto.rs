use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::{UploadSession, UploadStatus};
use crate::modules::storage::paths::extension_of;
use crate::modules::storage::{EntryKind, FileMetadata, SearchHit, StorageEntry};
use crate::shared::format::format_file_size;

/// Entry type as exposed over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemTypeDto {
    Folder,
    File,
}

impl From<EntryKind> for ItemTypeDto {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Folder => ItemTypeDto::Folder,
            EntryKind::File => ItemTypeDto::File,
        }
    }
}

/// One row of a folder listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrowseItemDto {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemTypeDto,
    pub path: String,
    /// Size in bytes, 0 for folders
    pub size: u64,
    /// Human readable size, absent for folders
    pub formatted_size: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    /// Lowercased extension with the dot, absent for folders
    pub extension: Option<String>,
}

impl From<StorageEntry> for BrowseItemDto {
    fn from(entry: StorageEntry) -> Self {
        let is_file = entry.kind == EntryKind::File;
        Self {
            formatted_size: is_file.then(|| format_file_size(entry.size)),
            extension: is_file.then(|| extension_of(&entry.name)),
            item_type: entry.kind.into(),
            path: entry.path.to_string(),
            size: entry.size,
            modified: entry.modified,
            name: entry.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BreadcrumbDto {
    pub name: String,
    pub path: String,
}

/// Folder listing with the caller's capabilities in that folder
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BrowseResponseDto {
    pub current_path: String,
    pub items: Vec<BrowseItemDto>,
    pub breadcrumbs: Vec<BreadcrumbDto>,
    pub can_upload: bool,
    pub can_delete: bool,
    pub can_create_folder: bool,
    /// Sum of file sizes directly in this folder
    pub total_size: u64,
    pub formatted_total_size: String,
    pub file_count: usize,
    pub folder_count: usize,
}

/// Upload form for OpenAPI documentation.
/// The handler reads the multipart stream directly; `folder_path` must come
/// before the `files` parts.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFormDto {
    /// Target folder
    #[schema(example = "/vesselA/reports")]
    pub folder_path: String,
    /// Client-chosen id for polling progress
    pub session_id: Option<String>,
    pub total_files: Option<i32>,
    pub total_size: Option<i64>,
    /// One part per file
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadedFileDto {
    /// Stored name, possibly renamed to avoid a collision
    pub name: String,
    pub path: String,
    pub size: u64,
    pub formatted_size: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponseDto {
    pub session_id: Option<String>,
    pub uploaded_files: Vec<UploadedFileDto>,
    pub total_size: u64,
    pub formatted_total_size: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadProgressDto {
    pub session_id: String,
    pub folder_path: String,
    pub total_files: i32,
    pub completed_files: i32,
    pub total_size: i64,
    pub uploaded_size: i64,
    pub status: UploadStatus,
    /// Percentage of files completed
    pub progress: f64,
}

impl From<UploadSession> for UploadProgressDto {
    fn from(session: UploadSession) -> Self {
        Self {
            progress: session.progress(),
            session_id: session.session_id,
            folder_path: session.folder_path,
            total_files: session.total_files,
            completed_files: session.completed_files,
            total_size: session.total_size,
            uploaded_size: session.uploaded_size,
            status: session.status,
        }
    }
}

/// File details returned by preview
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilePreviewDto {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub formatted_size: String,
    pub modified: Option<DateTime<Utc>>,
    pub extension: String,
    pub content_type: String,
}

impl From<FileMetadata> for FilePreviewDto {
    fn from(meta: FileMetadata) -> Self {
        Self {
            content_type: mime_guess::from_path(&meta.name)
                .first_or_octet_stream()
                .to_string(),
            formatted_size: format_file_size(meta.size),
            path: meta.path.to_string(),
            size: meta.size,
            modified: meta.modified,
            extension: meta.extension,
            name: meta.name,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteRequestDto {
    /// File or empty folder to delete
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponseDto {
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: ItemTypeDto,
    /// Size before removal, 0 for folders
    pub size: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequestDto {
    /// Parent folder, root when empty
    #[serde(default)]
    pub folder_path: String,

    #[validate(length(min = 1, max = 255, message = "Folder name must be 1-255 characters"))]
    pub folder_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateFolderResponseDto {
    pub path: String,
}

/// Query params for file search
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive filename substring
    #[serde(default)]
    pub q: String,
    /// Extension filter, with or without the leading dot
    #[serde(rename = "type")]
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResultDto {
    pub name: String,
    pub path: String,
    pub folder: String,
    pub size: u64,
    pub formatted_size: String,
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

impl From<SearchHit> for SearchResultDto {
    fn from(hit: SearchHit) -> Self {
        Self {
            formatted_size: format_file_size(hit.size),
            path: hit.path.to_string(),
            folder: hit.folder.to_string(),
            size: hit.size,
            extension: hit.extension,
            modified: hit.modified,
            name: hit.name,
        }
    }
}
