use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers;
use crate::features::files::services::FileService;

/// Create routes for the files feature; all require authentication
pub fn routes(file_service: Arc<FileService>, max_upload_size: usize) -> Router {
    Router::new()
        .route("/api/browser", get(handlers::browse_root))
        .route("/api/browser/{*path}", get(handlers::browse))
        .route("/api/download/{*path}", get(handlers::download_file))
        .route("/api/preview/{*path}", get(handlers::preview_file))
        .route(
            "/api/upload",
            post(handlers::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/api/upload/progress/{session_id}",
            get(handlers::upload_progress),
        )
        .route("/api/delete", post(handlers::delete_item))
        .route("/api/search", get(handlers::search_files))
        .route("/api/create-folder", post(handlers::create_folder))
        .with_state(file_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::activities::ActivityService;
    use crate::features::auth::model::AuthenticatedUser;
    use crate::features::permissions::{PermissionLevel, PermissionService};
    use crate::modules::storage::LocalStorage;
    use crate::shared::test_helpers::{
        admin_user, vessel_user, with_user, InMemoryActivityRepository,
        InMemoryPermissionRepository, InMemoryUploadSessionRepository,
    };
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const MAX_UPLOAD: usize = 10 * 1024 * 1024;

    struct Harness {
        dir: TempDir,
        permissions: Arc<PermissionService>,
        service: Arc<FileService>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir_all(dir.path().join("vesselA")).unwrap();
            std::fs::create_dir_all(dir.path().join("vesselB")).unwrap();

            let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());
            let permissions = Arc::new(PermissionService::new(Arc::new(
                InMemoryPermissionRepository::default(),
            )));
            let activities = Arc::new(ActivityService::new(Arc::new(
                InMemoryActivityRepository::default(),
            )));
            let service = Arc::new(FileService::new(
                storage,
                Arc::clone(&permissions),
                activities,
                Arc::new(InMemoryUploadSessionRepository::default()),
            ));

            Self {
                dir,
                permissions,
                service,
            }
        }

        fn server(&self, user: AuthenticatedUser) -> TestServer {
            let app = routes(Arc::clone(&self.service), MAX_UPLOAD);
            TestServer::new(with_user(app, user)).unwrap()
        }

        async fn vessel_a_writer(&self) -> AuthenticatedUser {
            let user = vessel_user("vessel_a");
            self.permissions
                .upsert_grant(user.user_id, "/vesselA", PermissionLevel::Write)
                .await
                .unwrap();
            user
        }
    }

    fn upload_form(folder: &str, name: &str, content: &[u8]) -> MultipartForm {
        MultipartForm::new().add_text("folder_path", folder.to_string()).add_part(
            "files",
            Part::bytes(content.to_vec())
                .file_name(name.to_string())
                .mime_type("application/octet-stream"),
        )
    }

    #[tokio::test]
    async fn test_upload_then_download_round_trip() {
        let harness = Harness::new();
        let server = harness.server(harness.vessel_a_writer().await);
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let uploaded: Value = server
            .post("/api/upload")
            .multipart(upload_form("/vesselA", "manifest.bin", &content))
            .await
            .json();
        assert_eq!(uploaded["data"]["uploaded_files"][0]["size"], content.len());

        let response = server.get("/api/download/vesselA/manifest.bin").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().as_ref(), content.as_slice());
        assert_eq!(
            response.header("content-length").to_str().unwrap(),
            content.len().to_string()
        );
        assert!(response
            .header("content-disposition")
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"manifest.bin\""));
    }

    #[tokio::test]
    async fn test_second_upload_gets_suffix() {
        let harness = Harness::new();
        let server = harness.server(harness.vessel_a_writer().await);

        for _ in 0..2 {
            server
                .post("/api/upload")
                .multipart(upload_form("/vesselA", "report.txt", b"data"))
                .await
                .assert_status_ok();
        }

        assert!(harness.dir.path().join("vesselA/report.txt").is_file());
        assert!(harness.dir.path().join("vesselA/report_1.txt").is_file());
    }

    #[tokio::test]
    async fn test_upload_session_is_tracked() {
        let harness = Harness::new();
        let server = harness.server(harness.vessel_a_writer().await);

        let form = MultipartForm::new()
            .add_text("folder_path", "/vesselA")
            .add_text("session_id", "batch-7")
            .add_text("total_files", "2")
            .add_part("files", Part::bytes(b"a".to_vec()).file_name("a.txt"))
            .add_part("files", Part::bytes(b"bb".to_vec()).file_name("b.txt"));
        server.post("/api/upload").multipart(form).await.assert_status_ok();

        let progress: Value = server.get("/api/upload/progress/batch-7").await.json();
        assert_eq!(progress["data"]["completed_files"], 2);
        assert_eq!(progress["data"]["uploaded_size"], 3);
        assert_eq!(progress["data"]["status"], "completed");
    }

    #[tokio::test]
    async fn test_batch_stops_at_failing_file() {
        let harness = Harness::new();
        let server = harness.server(harness.vessel_a_writer().await);

        let form = MultipartForm::new()
            .add_text("folder_path", "/vesselA")
            .add_text("session_id", "batch-9")
            .add_text("total_files", "3")
            .add_part("files", Part::bytes(b"first".to_vec()).file_name("ok.txt"))
            .add_part("files", Part::bytes(b"bad".to_vec()).file_name("***"))
            .add_part("files", Part::bytes(b"last".to_vec()).file_name("after.txt"));

        let response = server.post("/api/upload").multipart(form).expect_failure().await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["message"].as_str().unwrap().contains("***"));

        assert!(harness.dir.path().join("vesselA/ok.txt").exists());
        assert!(!harness.dir.path().join("vesselA/after.txt").exists());

        let progress: Value = server.get("/api/upload/progress/batch-9").await.json();
        assert_eq!(progress["data"]["completed_files"], 1);
        assert_eq!(progress["data"]["status"], "failed");
    }

    #[tokio::test]
    async fn test_upload_without_write_grant_is_forbidden() {
        let harness = Harness::new();
        let server = harness.server(harness.vessel_a_writer().await);

        let response = server
            .post("/api/upload")
            .multipart(upload_form("/vesselB", "x.txt", b"x"))
            .expect_failure()
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert!(!harness.dir.path().join("vesselB/x.txt").exists());
    }

    #[tokio::test]
    async fn test_other_vessel_is_forbidden_but_admin_is_not() {
        let harness = Harness::new();
        std::fs::write(harness.dir.path().join("vesselB/log.txt"), b"b").unwrap();

        let vessel = harness.server(harness.vessel_a_writer().await);
        vessel
            .get("/api/browser/vesselB")
            .expect_failure()
            .await
            .assert_status(StatusCode::FORBIDDEN);
        vessel
            .get("/api/download/vesselB/log.txt")
            .expect_failure()
            .await
            .assert_status(StatusCode::FORBIDDEN);
        vessel
            .post("/api/delete")
            .json(&json!({ "path": "/vesselB/log.txt" }))
            .expect_failure()
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let admin = harness.server(admin_user());
        let listing: Value = admin.get("/api/browser/vesselB").await.json();
        assert_eq!(listing["data"]["items"][0]["name"], "log.txt");
        assert_eq!(listing["data"]["items"][0]["type"], "file");
        admin
            .post("/api/delete")
            .json(&json!({ "path": "/vesselB/log.txt" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_delete_non_empty_folder_conflicts() {
        let harness = Harness::new();
        std::fs::write(harness.dir.path().join("vesselA/a.txt"), b"a").unwrap();
        let server = harness.server(admin_user());

        server
            .post("/api/delete")
            .json(&json!({ "path": "/vesselA" }))
            .expect_failure()
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_search_without_match_is_empty() {
        let harness = Harness::new();
        std::fs::write(harness.dir.path().join("vesselA/crew.pdf"), b"a").unwrap();
        let server = harness.server(harness.vessel_a_writer().await);

        let empty: Value = server
            .get("/api/search")
            .add_query_param("q", "zzz")
            .await
            .json();
        assert_eq!(empty["data"], json!([]));
        assert_eq!(empty["meta"]["total"], 0);

        let hits: Value = server
            .get("/api/search")
            .add_query_param("q", "CREW")
            .add_query_param("type", "pdf")
            .await
            .json();
        assert_eq!(hits["data"][0]["path"], "/vesselA/crew.pdf");
    }

    #[tokio::test]
    async fn test_traversal_in_body_is_bad_request() {
        let harness = Harness::new();
        let server = harness.server(admin_user());

        server
            .post("/api/delete")
            .json(&json!({ "path": "/vesselA/../../etc/passwd" }))
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/api/create-folder")
            .json(&json!({ "folder_path": "../outside", "folder_name": "x" }))
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_folder_and_preview() {
        let harness = Harness::new();
        std::fs::write(harness.dir.path().join("vesselA/photo.JPG"), b"jpeg").unwrap();
        let server = harness.server(harness.vessel_a_writer().await);

        let created: Value = server
            .post("/api/create-folder")
            .json(&json!({ "folder_path": "/vesselA", "folder_name": "Reports" }))
            .await
            .json();
        assert_eq!(created["data"]["path"], "/vesselA/Reports");

        let preview: Value = server.get("/api/preview/vesselA/photo.JPG").await.json();
        assert_eq!(preview["data"]["extension"], ".jpg");
        assert_eq!(preview["data"]["content_type"], "image/jpeg");
    }
}
