//! Landing data for a signed-in user: reachable folders and recent activity.

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::DashboardService;
