mod folder_permission;

pub use folder_permission::{FolderPermission, PermissionLevel};
