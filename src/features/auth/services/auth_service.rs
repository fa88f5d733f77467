use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{AuthResponseDto, ChangePasswordRequestDto, LoginRequestDto};
use crate::features::auth::jwt::JwtService;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::UserResponseDto;
use crate::features::users::services::{CreateUser, UserService};

/// Password login, token validation and account self-service
pub struct AuthService {
    users: Arc<UserService>,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(users: Arc<UserService>, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .users
            .find_by_username(&dto.username)
            .await?
            .ok_or_else(invalid)?;

        if !self.users.verify_password(&user, &dto.password).await? {
            tracing::info!("Failed login for {}", dto.username);
            return Err(invalid());
        }

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let access_token = self.jwt.issue(&user)?;
        let profile = self.users.profile(user.id).await?;
        tracing::info!("User {} logged in", user.username);

        Ok(AuthResponseDto {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.expires_in(),
            password_change_required: !profile.password_changed,
            user: UserResponseDto::new(user, profile),
        })
    }

    /// Resolve a bearer token to the current, active account
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.jwt.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        let user = match self.users.get(user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthorized("Unknown user".to_string()))
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        Ok(AuthenticatedUser {
            user_id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }

    pub async fn me(&self, user: &AuthenticatedUser) -> Result<UserResponseDto> {
        let account = self.users.get(user.user_id).await?;
        let profile = self.users.profile(user.user_id).await?;
        Ok(UserResponseDto::new(account, profile))
    }

    pub async fn change_password(
        &self,
        user: &AuthenticatedUser,
        dto: ChangePasswordRequestDto,
    ) -> Result<UserResponseDto> {
        let account = self.users.get(user.user_id).await?;

        if !self.users.verify_password(&account, &dto.old_password).await? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }
        if dto.old_password == dto.new_password {
            return Err(AppError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }

        let profile = self
            .users
            .change_password(user.user_id, dto.new_password)
            .await?;
        tracing::info!("User {} changed their password", user.username);

        Ok(UserResponseDto::new(account, profile))
    }

    /// Create the configured administrator when it does not exist yet
    pub async fn bootstrap_admin(&self, username: &str, password: &str) -> Result<()> {
        if self.users.find_by_username(username).await?.is_some() {
            tracing::info!("Bootstrap admin {} already exists", username);
            return Ok(());
        }

        self.users
            .create_user(CreateUser {
                username: username.to_string(),
                password: password.to_string(),
                is_admin: true,
                vessel_name: String::new(),
            })
            .await?;
        tracing::info!("Created bootstrap admin {}", username);
        Ok(())
    }
}
