//! Local filesystem storage confined to a single root directory
//!
//! All logical paths are resolved through [`LocalStorage::resolve`], which
//! joins the lexically-normalized path onto the canonical root and then
//! canonicalizes the deepest existing ancestor to make sure no symlink leads
//! outside the root. Recursive walks (tree, search) run on the blocking pool.

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::error::{AppError, Result};
use crate::modules::storage::paths::{extension_of, sanitize_filename, split_extension, LogicalPath};
use crate::shared::constants::{DOWNLOAD_CHUNK_SIZE, MAX_NAME_COLLISIONS, MAX_SEARCH_RESULTS};

/// Kind of a directory entry; folders sort before files
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Folder,
    File,
}

/// One row of a folder listing
#[derive(Debug, Clone)]
pub struct StorageEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: LogicalPath,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Result of a successful upload write
#[derive(Debug, Clone)]
pub struct SavedFile {
    /// Final name on disk, possibly with a `_N` suffix
    pub name: String,
    pub path: LogicalPath,
    pub size: u64,
}

/// What a delete removed; `size` is captured before removal
#[derive(Debug, Clone, Copy)]
pub struct DeletedItem {
    pub kind: EntryKind,
    pub size: u64,
}

/// Metadata of a single file
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub name: String,
    pub path: LogicalPath,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub extension: String,
}

/// Open handle for streaming a file back to a client
#[derive(Debug)]
pub struct OpenedFile {
    pub file: fs::File,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// Single-level folder entry for the admin picker
#[derive(Debug, Clone)]
pub struct FolderSummary {
    pub name: String,
    pub path: LogicalPath,
    pub has_children: bool,
}

/// Recursive folder tree node
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub path: LogicalPath,
    pub children: Vec<TreeNode>,
}

/// File matched by a search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub name: String,
    pub path: LogicalPath,
    pub folder: LogicalPath,
    pub size: u64,
    pub extension: String,
    pub modified: Option<DateTime<Utc>>,
}

/// Filesystem adapter rooted at one storage directory
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create the storage root if needed and remember its canonical form
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        info!("Local storage rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Map a logical path to a physical one that is guaranteed to stay under the root
    pub async fn resolve(&self, path: &LogicalPath) -> Result<PathBuf> {
        let physical = self.root.join(path.to_relative());

        for ancestor in physical.ancestors() {
            match fs::canonicalize(ancestor).await {
                Ok(canonical) => {
                    if !canonical.starts_with(&self.root) {
                        warn!("Rejected path escaping storage root: {}", path);
                        return Err(AppError::Forbidden(format!(
                            "Path is outside the storage root: {}",
                            path
                        )));
                    }
                    return Ok(physical);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal("Storage root is not accessible".to_string()))
    }

    /// List a folder, creating it first when it does not exist yet
    pub async fn list(&self, folder: &LogicalPath) -> Result<Vec<StorageEntry>> {
        let dir = self.resolve(folder).await?;
        fs::create_dir_all(&dir).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => AppError::BadRequest(format!("Not a folder: {}", folder)),
            _ => AppError::Io(e),
        })?;

        let mut read_dir = fs::read_dir(&dir).await?;
        let mut entries = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 entry in {}", folder);
                continue;
            };

            // Entries may disappear between readdir and stat
            let metadata = match fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let kind = if metadata.is_dir() {
                EntryKind::Folder
            } else {
                EntryKind::File
            };

            entries.push(StorageEntry {
                path: folder.join(&name)?,
                size: if kind == EntryKind::File { metadata.len() } else { 0 },
                modified: metadata.modified().ok().map(to_utc),
                name,
                kind,
            });
        }

        entries.sort_by_cached_key(|e| (e.kind, e.name.to_lowercase()));
        Ok(entries)
    }

    /// Stream an upload into `folder`, renaming on collision.
    ///
    /// The name is claimed with an exclusive create so two concurrent uploads
    /// of the same name can never write into the same file.
    pub async fn save<S, E>(&self, folder: &LogicalPath, filename: &str, mut body: S) -> Result<SavedFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let name = sanitize_filename(filename)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid filename: {}", filename)))?;

        let dir = self.resolve(folder).await?;
        fs::create_dir_all(&dir).await?;

        let (mut file, stored_name, physical) = claim_unique_name(&dir, &name).await?;
        let mut size: u64 = 0;

        while let Some(chunk) = body.next().await {
            let written = match chunk {
                Ok(bytes) => file.write_all(&bytes).await.map(|_| bytes.len() as u64).map_err(AppError::Io),
                Err(e) => Err(AppError::BadRequest(format!(
                    "Failed to read upload data for {}: {}",
                    filename, e
                ))),
            };

            match written {
                Ok(n) => size += n,
                Err(e) => {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&physical).await {
                        warn!("Failed to remove partial upload {}: {}", stored_name, cleanup);
                    }
                    return Err(e);
                }
            }
        }

        file.flush().await?;

        let path = folder.join(&stored_name)?;
        debug!("Stored upload {} ({} bytes)", path, size);

        Ok(SavedFile {
            name: stored_name,
            path,
            size,
        })
    }

    /// Delete a file or an empty folder
    pub async fn delete(&self, path: &LogicalPath) -> Result<DeletedItem> {
        if path.is_root() {
            return Err(AppError::BadRequest(
                "The storage root cannot be deleted".to_string(),
            ));
        }

        let physical = self.resolve(path).await?;
        let metadata = match fs::symlink_metadata(&physical).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound("File/folder not found".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            let mut entries = fs::read_dir(&physical).await?;
            if entries.next_entry().await?.is_some() {
                return Err(AppError::Conflict("Folder is not empty".to_string()));
            }
            fs::remove_dir(&physical).await?;
            info!("Deleted folder {}", path);

            Ok(DeletedItem {
                kind: EntryKind::Folder,
                size: 0,
            })
        } else {
            let size = metadata.len();
            fs::remove_file(&physical).await?;
            info!("Deleted file {} ({} bytes)", path, size);

            Ok(DeletedItem {
                kind: EntryKind::File,
                size,
            })
        }
    }

    /// Create `name` under `parent`; succeeds if the folder already exists
    pub async fn create_folder(&self, parent: &LogicalPath, name: &str) -> Result<LogicalPath> {
        let safe_name = sanitize_filename(name)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid folder name: {}", name)))?;
        let target = parent.join(&safe_name)?;
        let physical = self.resolve(&target).await?;

        fs::create_dir_all(&physical).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => {
                AppError::Conflict(format!("A file named {} already exists", safe_name))
            }
            _ => AppError::Io(e),
        })?;

        Ok(target)
    }

    /// Whether `folder` exists as a directory
    pub async fn folder_exists(&self, folder: &LogicalPath) -> Result<bool> {
        let dir = self.resolve(folder).await?;
        match fs::metadata(&dir).await {
            Ok(m) => Ok(m.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata of a regular file
    pub async fn stat(&self, path: &LogicalPath) -> Result<FileMetadata> {
        let physical = self.resolve(path).await?;
        let metadata = file_metadata(&physical).await?;
        let name = path.file_name().unwrap_or_default().to_string();

        Ok(FileMetadata {
            extension: extension_of(&name),
            name,
            path: path.clone(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(to_utc),
        })
    }

    /// Open a regular file for streaming, inferring its MIME type from the extension
    pub async fn open(&self, path: &LogicalPath) -> Result<OpenedFile> {
        let physical = self.resolve(path).await?;
        let metadata = file_metadata(&physical).await?;
        let file = fs::File::open(&physical).await?;
        let name = path.file_name().unwrap_or_default().to_string();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();

        Ok(OpenedFile {
            file,
            name,
            size: metadata.len(),
            content_type,
        })
    }

    /// Immediate sub-folders of `folder`, alphabetical
    pub async fn list_folders(&self, folder: &LogicalPath) -> Result<Vec<FolderSummary>> {
        let dir = self.resolve(folder).await?;
        if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(AppError::NotFound("Path does not exist".to_string()));
        }

        let mut read_dir = fs::read_dir(&dir).await?;
        let mut folders = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            folders.push(FolderSummary {
                path: folder.join(&name)?,
                has_children: has_subfolder(&entry.path()).await,
                name,
            });
        }

        folders.sort_by_cached_key(|f| f.name.to_lowercase());
        Ok(folders)
    }

    /// Full recursive folder tree below `start`; missing start yields an empty tree
    pub async fn build_tree(&self, start: &LogicalPath) -> Result<Vec<TreeNode>> {
        let dir = self.resolve(start).await?;
        let start = start.clone();

        let tree = tokio::task::spawn_blocking(move || {
            let mut visited = HashSet::new();
            walk_tree(&dir, &start, &mut visited)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Folder tree task failed: {}", e)))?;

        Ok(tree)
    }

    /// Case-insensitive filename search below every root.
    ///
    /// Roots nested inside another root are dropped so each file is reported
    /// once. `extension` may be given with or without the leading dot.
    pub async fn search(
        &self,
        roots: &[LogicalPath],
        query: &str,
        extension: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let extension = extension
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{}", e));

        let mut resolved = Vec::new();
        for root in collapse_roots(roots) {
            let physical = self.resolve(&root).await?;
            resolved.push((root, physical));
        }

        let hits = tokio::task::spawn_blocking(move || {
            let mut hits = Vec::new();
            for (root, physical) in &resolved {
                search_tree(physical, root, &needle, extension.as_deref(), &mut hits);
            }
            hits
        })
        .await
        .map_err(|e| AppError::Internal(format!("Search task failed: {}", e)))?;

        Ok(hits)
    }
}

impl OpenedFile {
    /// Chunked body stream so large downloads are never buffered whole
    pub fn into_stream(self) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        futures::stream::try_unfold(self.file, |mut file| async move {
            let mut buf = vec![0u8; DOWNLOAD_CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        })
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

async fn file_metadata(physical: &Path) -> Result<std::fs::Metadata> {
    match fs::metadata(physical).await {
        Ok(m) if m.is_file() => Ok(m),
        Ok(_) => Err(AppError::NotFound("File not found".to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(AppError::NotFound("File not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn claim_unique_name(dir: &Path, name: &str) -> Result<(fs::File, String, PathBuf)> {
    let (stem, ext) = split_extension(name);

    for counter in 0..=MAX_NAME_COLLISIONS {
        let candidate = if counter == 0 {
            name.to_string()
        } else {
            format!("{}_{}{}", stem, counter, ext)
        };
        let physical = dir.join(&candidate);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&physical)
            .await
        {
            Ok(file) => return Ok((file, candidate, physical)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(format!(
        "Too many files named {} in this folder",
        name
    )))
}

async fn has_subfolder(dir: &Path) -> bool {
    let Ok(mut read_dir) = fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            return true;
        }
    }
    false
}

/// Drop duplicate roots and roots already covered by an ancestor root
fn collapse_roots(roots: &[LogicalPath]) -> Vec<LogicalPath> {
    let mut sorted: Vec<LogicalPath> = roots.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut kept: Vec<LogicalPath> = Vec::new();
    for root in sorted {
        if !kept.iter().any(|k| root.is_within(k)) {
            kept.push(root);
        }
    }
    kept
}

// Symlinked directories are never descended into (DirEntry::file_type does
// not follow links) and each canonical directory is visited at most once.
fn walk_tree(dir: &Path, logical: &LogicalPath, visited: &mut HashSet<PathBuf>) -> Vec<TreeNode> {
    let Ok(canonical) = std::fs::canonicalize(dir) else {
        return Vec::new();
    };
    if !visited.insert(canonical) {
        return Vec::new();
    }

    let read_dir = match std::fs::read_dir(dir) {
        Ok(r) => r,
        Err(e) => {
            warn!("Error reading directory {}: {}", logical, e);
            return Vec::new();
        }
    };

    let mut nodes = Vec::new();
    for entry in read_dir.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Ok(child) = logical.join(&name) else {
            continue;
        };

        let children = walk_tree(&entry.path(), &child, visited);
        nodes.push(TreeNode {
            name,
            path: child,
            children,
        });
    }

    nodes.sort_by_cached_key(|n| n.name.to_lowercase());
    nodes
}

fn search_tree(
    dir: &Path,
    logical: &LogicalPath,
    needle: &str,
    extension: Option<&str>,
    hits: &mut Vec<SearchHit>,
) {
    let mut pending = vec![(dir.to_path_buf(), logical.clone())];
    let mut visited = HashSet::new();

    while let Some((dir, logical)) = pending.pop() {
        if hits.len() >= MAX_SEARCH_RESULTS {
            return;
        }
        let Ok(canonical) = std::fs::canonicalize(&dir) else {
            continue;
        };
        if !visited.insert(canonical) {
            continue;
        }
        let Ok(read_dir) = std::fs::read_dir(&dir) else {
            continue;
        };

        for entry in read_dir.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(child) = logical.join(&name) else {
                continue;
            };

            if file_type.is_dir() {
                pending.push((entry.path(), child));
                continue;
            }
            if !file_type.is_file() || !name.to_lowercase().contains(needle) {
                continue;
            }

            let file_ext = extension_of(&name);
            if extension.is_some_and(|wanted| wanted != file_ext) {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            hits.push(SearchHit {
                folder: logical.clone(),
                path: child,
                name,
                size: metadata.len(),
                extension: file_ext,
                modified: metadata.modified().ok().map(to_utc),
            });
            if hits.len() >= MAX_SEARCH_RESULTS {
                return;
            }
        }
    }
}
