use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::users::models::{NewUser, User, UserProfile};

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, is_active, created_at";
const PROFILE_COLUMNS: &str = "user_id, password_changed, vessel_name, updated_at";

/// Storage for accounts and profiles
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn list(&self) -> Result<Vec<User>>;

    /// Insert the user and its profile; `Conflict` when the username is taken
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<UserProfile>;

    async fn set_password_changed(&self, user_id: Uuid, changed: bool) -> Result<UserProfile>;
}

/// Convert unique violations on `users.username` into a conflict
fn handle_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            return AppError::Conflict("Username already exists".to_string());
        }
    }

    AppError::Database(e)
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY username",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(handle_db_error)?;

        sqlx::query("INSERT INTO user_profiles (user_id, vessel_name) VALUES ($1, $2)")
            .bind(created.id)
            .bind(&user.vessel_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn set_password_changed(&self, user_id: Uuid, changed: bool) -> Result<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO user_profiles (user_id, password_changed)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET password_changed = EXCLUDED.password_changed, updated_at = NOW()
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(changed)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
