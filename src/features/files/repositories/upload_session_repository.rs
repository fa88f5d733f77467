use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{NewUploadSession, UploadSession, UploadStatus};

const SESSION_COLUMNS: &str = "session_id, user_id, folder_path, total_files, completed_files, \
     total_size, uploaded_size, status, created_at, updated_at";

/// Progress records for multi-file uploads
#[async_trait]
pub trait UploadSessionRepository: Send + Sync {
    /// `Conflict` when the user already has a session with this id
    async fn create(&self, session: NewUploadSession) -> Result<UploadSession>;

    /// Only returns sessions owned by `user_id`
    async fn find(&self, session_id: &str, user_id: Uuid) -> Result<Option<UploadSession>>;

    /// Count one more stored file of `size` bytes
    async fn record_file(&self, session_id: &str, user_id: Uuid, size: i64) -> Result<()>;

    async fn set_status(&self, session_id: &str, user_id: Uuid, status: UploadStatus)
        -> Result<()>;
}

pub struct PgUploadSessionRepository {
    pool: PgPool,
}

impl PgUploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadSessionRepository for PgUploadSessionRepository {
    async fn create(&self, session: NewUploadSession) -> Result<UploadSession> {
        sqlx::query_as::<_, UploadSession>(&format!(
            r#"
            INSERT INTO upload_sessions (session_id, user_id, folder_path, total_files, total_size)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, session_id) DO NOTHING
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(&session.session_id)
        .bind(session.user_id)
        .bind(&session.folder_path)
        .bind(session.total_files)
        .bind(session.total_size)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Upload session already exists".to_string()))
    }

    async fn find(&self, session_id: &str, user_id: Uuid) -> Result<Option<UploadSession>> {
        sqlx::query_as::<_, UploadSession>(&format!(
            "SELECT {} FROM upload_sessions WHERE session_id = $1 AND user_id = $2",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn record_file(&self, session_id: &str, user_id: Uuid, size: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET completed_files = completed_files + 1,
                uploaded_size = uploaded_size + $3,
                updated_at = NOW()
            WHERE session_id = $1 AND user_id = $2
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(size)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        session_id: &str,
        user_id: Uuid,
        status: UploadStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = $3, updated_at = NOW()
            WHERE session_id = $1 AND user_id = $2
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
