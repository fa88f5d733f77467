mod permission_service;

pub use permission_service::{grants_allow, PermissionService};
