pub mod activities;
pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod files;
pub mod permissions;
pub mod users;
