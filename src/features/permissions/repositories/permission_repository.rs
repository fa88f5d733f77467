use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::permissions::models::{FolderPermission, PermissionLevel};

/// Storage for folder grants
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FolderPermission>>;

    /// Insert or replace the level of the `(user, folder)` grant
    async fn upsert(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission>;

    /// Insert only when absent; an existing grant keeps its level
    async fn get_or_create(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission>;

    /// Returns false when no grant had this id
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FolderPermission>> {
        sqlx::query_as::<_, FolderPermission>(
            r#"
            SELECT id, user_id, folder_path, permission, created_at
            FROM folder_permissions
            WHERE user_id = $1
            ORDER BY folder_path
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list folder permissions: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        sqlx::query_as::<_, FolderPermission>(
            r#"
            INSERT INTO folder_permissions (id, user_id, folder_path, permission)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, folder_path)
            DO UPDATE SET permission = EXCLUDED.permission
            RETURNING id, user_id, folder_path, permission, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(folder_path)
        .bind(level)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert folder permission: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        sqlx::query(
            r#"
            INSERT INTO folder_permissions (id, user_id, folder_path, permission)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, folder_path) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(folder_path)
        .bind(level)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, FolderPermission>(
            r#"
            SELECT id, user_id, folder_path, permission, created_at
            FROM folder_permissions
            WHERE user_id = $1 AND folder_path = $2
            "#,
        )
        .bind(user_id)
        .bind(folder_path)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folder_permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
