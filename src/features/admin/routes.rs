use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::features::admin::handlers;
use crate::features::admin::services::AdminService;

/// Create admin routes (all require the admin role); nest under `/api/admin`
pub fn routes(admin_service: Arc<AdminService>) -> Router {
    Router::new()
        .route("/folder-browser", get(handlers::folder_browser))
        .route("/get-folders", get(handlers::get_folders))
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/users/{id}/active", put(handlers::set_user_active))
        .route("/users/{id}/actions", post(handlers::user_action))
        .route(
            "/users/{id}/permissions",
            get(handlers::list_user_permissions).put(handlers::upsert_user_permission),
        )
        .route("/permissions/{id}", delete(handlers::revoke_permission))
        .route("/activities", get(handlers::list_activities))
        .with_state(admin_service)
}
