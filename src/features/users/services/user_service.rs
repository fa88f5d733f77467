use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::users::models::{NewUser, User, UserProfile};
use crate::features::users::repositories::UserRepository;

/// Input for creating an account with a plaintext password
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub is_admin: bool,
    pub vessel_name: String,
}

/// Service for accounts, profiles and password hashing
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self {
            repository,
            bcrypt_cost,
        }
    }

    pub async fn create_user(&self, input: CreateUser) -> Result<User> {
        let password_hash = self.hash_password(input.password).await?;

        let user = self
            .repository
            .create(NewUser {
                username: input.username,
                password_hash,
                is_admin: input.is_admin,
                vessel_name: input.vessel_name,
            })
            .await?;

        tracing::info!("Created user {} (admin: {})", user.username, user.is_admin);
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.repository.find_by_username(username).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.repository.list().await
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<User> {
        self.repository
            .set_active(id, is_active)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.repository.get_or_create_profile(user_id).await
    }

    /// Store a new password and mark the initial password as changed
    pub async fn change_password(&self, user_id: Uuid, new_password: String) -> Result<UserProfile> {
        let password_hash = self.hash_password(new_password).await?;
        self.repository.update_password(user_id, &password_hash).await?;
        self.repository.set_password_changed(user_id, true).await
    }

    /// Force a password change on next login
    pub async fn require_password_change(&self, user_id: Uuid) -> Result<UserProfile> {
        self.get(user_id).await?;
        self.repository.set_password_changed(user_id, false).await
    }

    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = user.password_hash.clone();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password check failed: {}", e)))
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let cost = self.bcrypt_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Password hash task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }
}
