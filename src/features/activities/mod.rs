//! Append-only log of file operations.
//!
//! Every successful upload, download, delete and preview appends one
//! [`models::FileActivity`]. Recording is best-effort: a failed insert is logged and
//! never fails the file operation that triggered it.

pub mod dtos;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{ActivityType, NewActivity};
pub use repositories::{ActivityRepository, PgActivityRepository};
pub use services::ActivityService;
