//! Administrator-only endpoints.
//!
//! Access is decided by the account's admin role through [`RequireAdmin`],
//! never by folder grants. All routes are nested under `/api/admin`.
//!
//! [`RequireAdmin`]: crate::features::auth::guards::RequireAdmin

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use services::AdminService;
