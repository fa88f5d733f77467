mod upload_session_repository;

pub use upload_session_repository::{PgUploadSessionRepository, UploadSessionRepository};
