//! First-run administration.
//!
//! Both operations are gated by a shared secret from configuration so a
//! fresh deployment can bootstrap its first superuser over HTTP.

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use super::user::{UserResponse, hash_password};

/// Input for creating or reclaiming the first superuser.
#[derive(Debug, Deserialize, Validate)]
pub struct EnsureSuperuserInput {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    /// Setup token, when not sent as a header.
    #[serde(default)]
    pub token: Option<String>,
}

/// Input for promoting an existing account.
#[derive(Debug, Deserialize)]
pub struct PromoteInput {
    pub username: String,

    #[serde(default = "default_true")]
    pub superuser: bool,

    /// Setup token, when not sent as a header.
    #[serde(default)]
    pub token: Option<String>,
}

const fn default_true() -> bool {
    true
}

/// Setup service.
#[derive(Clone)]
pub struct SetupService {
    user_repo: UserRepository,
    setup_token: Option<String>,
    id_gen: IdGenerator,
}

impl SetupService {
    /// Create a new setup service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, setup_token: Option<String>) -> Self {
        Self {
            user_repo,
            setup_token,
            id_gen: IdGenerator::new(),
        }
    }

    /// Check a presented setup token against configuration.
    pub fn authorize(&self, presented: Option<&str>) -> AppResult<()> {
        match (self.setup_token.as_deref(), presented) {
            (Some(expected), Some(given)) if !expected.is_empty() && expected == given => Ok(()),
            (None, _) => Err(AppError::Forbidden("Setup is disabled".to_string())),
            _ => {
                warn!("Rejected setup request with invalid token");
                Err(AppError::Forbidden("Invalid setup token".to_string()))
            }
        }
    }

    /// Create the first superuser, or promote an existing account with that username.
    pub async fn ensure_superuser(&self, input: EnsureSuperuserInput) -> AppResult<UserResponse> {
        input.validate()?;

        if self.user_repo.superuser_exists().await? {
            return Err(AppError::Forbidden(
                "A superuser already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let user = match self.user_repo.find_by_username(&input.username).await? {
            Some(existing) => {
                let mut active: user::ActiveModel = existing.into();
                active.email = Set(input.email);
                active.password_hash = Set(password_hash);
                active.is_active = Set(true);
                active.is_staff = Set(true);
                active.is_superuser = Set(true);
                active.updated_at = Set(Some(now.into()));
                self.user_repo.update(active).await?
            }
            None => {
                self.user_repo
                    .create(user::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        username: Set(input.username),
                        email: Set(input.email),
                        password_hash: Set(password_hash),
                        first_name: Set(String::new()),
                        last_name: Set(String::new()),
                        is_active: Set(true),
                        is_staff: Set(true),
                        is_superuser: Set(true),
                        can_use_rich_editor: Set(false),
                        rich_editor_requested: Set(false),
                        created_at: Set(now.into()),
                        ..Default::default()
                    })
                    .await?
            }
        };

        info!(user_id = %user.id, username = %user.username, "Superuser ensured");
        Ok(UserResponse::from_model(user, false))
    }

    /// Make an existing account active staff, and superuser when requested.
    pub async fn promote(&self, input: PromoteInput) -> AppResult<UserResponse> {
        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(input.username.clone()))?;

        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(true);
        active.is_staff = Set(true);
        if input.superuser {
            active.is_superuser = Set(true);
        }
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.user_repo.update(active).await?;

        info!(
            user_id = %updated.id,
            username = %updated.username,
            superuser = updated.is_superuser,
            "Promoted user"
        );
        Ok(UserResponse::from_model(updated, false))
    }
}
