//! Folder grants and the authorization rules built on them.
//!
//! A grant `(user, folder_path, level)` authorizes the whole subtree below
//! `folder_path`. Levels are ordered `read < write < admin`; administrators
//! bypass grants entirely.

pub mod models;
pub mod repositories;
pub mod services;

pub use models::{FolderPermission, PermissionLevel};
pub use repositories::{PermissionRepository, PgPermissionRepository};
pub use services::PermissionService;
