//! Portal accounts and their profiles.
//!
//! Accounts are created by the startup bootstrap or by an administrator and
//! are deactivated rather than deleted. Each account has a 1:1 profile that
//! is created lazily and tracks whether the initial password was changed.

pub mod dtos;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::User;
pub use repositories::{PgUserRepository, UserRepository};
pub use services::UserService;
