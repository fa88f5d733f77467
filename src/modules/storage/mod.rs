//! Storage module for file management
//!
//! Confines every client path to a single local storage root and provides
//! listing, streaming upload/download, folder trees and filename search.

mod local_storage;
pub mod paths;

pub use local_storage::{
    DeletedItem, EntryKind, FileMetadata, FolderSummary, LocalStorage, OpenedFile, SavedFile,
    SearchHit, StorageEntry, TreeNode,
};
pub use paths::LogicalPath;
