//! Fixtures shared by unit and handler tests: canned users, an
//! auth-injecting router layer and in-memory repository implementations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};
use crate::features::activities::models::{ActivityFilter, FileActivity, NewActivity};
use crate::features::activities::repositories::ActivityRepository;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::models::{NewUploadSession, UploadSession, UploadStatus};
use crate::features::files::repositories::UploadSessionRepository;
use crate::features::permissions::models::{FolderPermission, PermissionLevel};
use crate::features::permissions::repositories::PermissionRepository;
use crate::features::users::models::{NewUser, User, UserProfile};
use crate::features::users::repositories::UserRepository;

/// Lowest cost bcrypt accepts, keeps hashing fast in tests
pub const TEST_BCRYPT_COST: u32 = 4;

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret-that-is-at-least-32-bytes-long".to_string(),
        jwt_expiry: Duration::from_secs(3600),
        jwt_leeway: Duration::from_secs(0),
        bcrypt_cost: TEST_BCRYPT_COST,
        bootstrap_admin_username: None,
        bootstrap_admin_password: None,
    }
}

pub fn admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        username: "admin".to_string(),
        is_admin: true,
    }
}

pub fn vessel_user(username: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        is_admin: false,
    }
}

/// Wrap `router` so every request arrives authenticated as `user`
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

// =============================================================================
// IN-MEMORY REPOSITORIES
// =============================================================================

#[derive(Default)]
pub struct InMemoryPermissionRepository {
    grants: Mutex<Vec<FolderPermission>>,
}

impl InMemoryPermissionRepository {
    fn insert(
        grants: &mut Vec<FolderPermission>,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> FolderPermission {
        let grant = FolderPermission {
            id: Uuid::now_v7(),
            user_id,
            folder_path: folder_path.to_string(),
            permission: level,
            created_at: Utc::now(),
        };
        grants.push(grant.clone());
        grant
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FolderPermission>> {
        let mut grants: Vec<_> = self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.folder_path.cmp(&b.folder_path));
        Ok(grants)
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        let mut grants = self.grants.lock().unwrap();
        if let Some(existing) = grants
            .iter_mut()
            .find(|g| g.user_id == user_id && g.folder_path == folder_path)
        {
            existing.permission = level;
            return Ok(existing.clone());
        }
        Ok(Self::insert(&mut grants, user_id, folder_path, level))
    }

    async fn get_or_create(
        &self,
        user_id: Uuid,
        folder_path: &str,
        level: PermissionLevel,
    ) -> Result<FolderPermission> {
        let mut grants = self.grants.lock().unwrap();
        if let Some(existing) = grants
            .iter()
            .find(|g| g.user_id == user_id && g.folder_path == folder_path)
        {
            return Ok(existing.clone());
        }
        Ok(Self::insert(&mut grants, user_id, folder_path, level))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut grants = self.grants.lock().unwrap();
        let before = grants.len();
        grants.retain(|g| g.id != id);
        Ok(grants.len() != before)
    }
}

#[derive(Default)]
pub struct InMemoryActivityRepository {
    activities: Mutex<Vec<FileActivity>>,
}

impl InMemoryActivityRepository {
    fn matches(activity: &FileActivity, filter: &ActivityFilter) -> bool {
        if filter
            .activity_type
            .is_some_and(|t| t != activity.activity_type)
        {
            return false;
        }
        if filter.user_id.is_some_and(|id| id != activity.user_id) {
            return false;
        }
        match &filter.search {
            Some(search) => {
                let needle = search.to_lowercase();
                [&activity.filename, &activity.filepath, &activity.username]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn insert(&self, activity: NewActivity) -> Result<FileActivity> {
        let stored = FileActivity {
            id: Uuid::now_v7(),
            user_id: activity.user_id,
            username: activity.username,
            filename: activity.filename,
            filepath: activity.filepath,
            activity_type: activity.activity_type,
            ip_address: activity.ip_address,
            file_size: activity.file_size,
            created_at: Utc::now(),
        };
        self.activities.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FileActivity>> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileActivity>, i64)> {
        let activities = self.activities.lock().unwrap();
        let matching: Vec<_> = activities
            .iter()
            .rev()
            .filter(|a| Self::matches(a, filter))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

/// Activity store whose writes always fail
pub struct FailingActivityRepository;

#[async_trait]
impl ActivityRepository for FailingActivityRepository {
    async fn insert(&self, _activity: NewActivity) -> Result<FileActivity> {
        Err(AppError::Internal("activity store unavailable".to_string()))
    }

    async fn recent_for_user(&self, _user_id: Uuid, _limit: i64) -> Result<Vec<FileActivity>> {
        Ok(Vec::new())
    }

    async fn list(
        &self,
        _filter: &ActivityFilter,
        _limit: i64,
        _offset: i64,
    ) -> Result<(Vec<FileActivity>, i64)> {
        Ok((Vec::new(), 0))
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepository {
    fn default_profile(user_id: Uuid, vessel_name: String) -> UserProfile {
        UserProfile {
            user_id,
            password_changed: false,
            vessel_name,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let created = User {
            id: Uuid::now_v7(),
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        self.profiles.lock().unwrap().insert(
            created.id,
            Self::default_profile(created.id, user.vessel_name),
        );
        Ok(created)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            user.is_active = is_active;
            user.clone()
        }))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        if let Some(user) = self.users.lock().unwrap().iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| Self::default_profile(user_id, String::new()))
            .clone())
    }

    async fn set_password_changed(&self, user_id: Uuid, changed: bool) -> Result<UserProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id)
            .or_insert_with(|| Self::default_profile(user_id, String::new()));
        profile.password_changed = changed;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct InMemoryUploadSessionRepository {
    sessions: Mutex<HashMap<(Uuid, String), UploadSession>>,
}

#[async_trait]
impl UploadSessionRepository for InMemoryUploadSessionRepository {
    async fn create(&self, session: NewUploadSession) -> Result<UploadSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let key = (session.user_id, session.session_id.clone());
        if sessions.contains_key(&key) {
            return Err(AppError::Conflict(
                "Upload session already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = UploadSession {
            session_id: session.session_id.clone(),
            user_id: session.user_id,
            folder_path: session.folder_path,
            total_files: session.total_files,
            completed_files: 0,
            total_size: session.total_size,
            uploaded_size: 0,
            status: UploadStatus::Uploading,
            created_at: now,
            updated_at: now,
        };
        sessions.insert(key, created.clone());
        Ok(created)
    }

    async fn find(&self, session_id: &str, user_id: Uuid) -> Result<Option<UploadSession>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&(user_id, session_id.to_string()))
            .cloned())
    }

    async fn record_file(&self, session_id: &str, user_id: Uuid, size: i64) -> Result<()> {
        let key = (user_id, session_id.to_string());
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&key) {
            session.completed_files += 1;
            session.uploaded_size += size;
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_status(
        &self,
        session_id: &str,
        user_id: Uuid,
        status: UploadStatus,
    ) -> Result<()> {
        let key = (user_id, session_id.to_string());
        if let Some(session) = self.sessions.lock().unwrap().get_mut(&key) {
            session.status = status;
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}
