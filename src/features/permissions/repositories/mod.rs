mod permission_repository;

pub use permission_repository::{PermissionRepository, PgPermissionRepository};
