//! User service.

use std::collections::HashSet;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{unblock_request, user},
    repositories::{BlockingRepository, UnblockRequestRepository, UserRepository},
};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    unblock_request_repo: UnblockRequestRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    /// Confirmation; must equal `password`.
    pub password2: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    #[validate(url)]
    pub profile_picture: Option<String>,

    #[validate(url)]
    pub cover_photo: Option<String>,

    pub date_of_birth: Option<NaiveDate>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    /// Clear the profile picture. Wins over `profile_picture`.
    #[serde(default)]
    pub remove_profile_picture: bool,

    /// Clear the cover photo. Wins over `cover_photo`.
    #[serde(default)]
    pub remove_cover_photo: bool,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub created_at: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Effective access: granted explicitly or implied by staff status.
    pub can_use_rich_editor: bool,
    pub rich_editor_requested: bool,
    pub is_active: bool,
    /// Whether this account has blocked the viewer.
    pub has_blocked_me: bool,
}

impl UserResponse {
    #[must_use]
    pub fn from_model(user: user::Model, has_blocked_me: bool) -> Self {
        let can_use_rich_editor = user.has_rich_editor_access();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            cover_photo: user.cover_photo,
            date_of_birth: user.date_of_birth,
            location: user.location,
            website: user.website,
            created_at: user.created_at.to_rfc3339(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            can_use_rich_editor,
            rich_editor_requested: user.rich_editor_requested,
            is_active: user.is_active,
            has_blocked_me,
        }
    }

    /// Build a view relative to a viewer, given the IDs of accounts that block them.
    #[must_use]
    pub fn for_viewer(user: user::Model, blockers: &HashSet<String>) -> Self {
        let has_blocked_me = blockers.contains(&user.id);
        Self::from_model(user, has_blocked_me)
    }
}

/// Outcome of a rich editor access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RichEditorRequest {
    AlreadyGranted,
    AlreadyRequested,
    Requested,
}

impl RichEditorRequest {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::AlreadyGranted => "You already have access to the rich text editor",
            Self::AlreadyRequested => "You have already requested access. Please wait for admin approval.",
            Self::Requested => "Rich editor access requested. An admin will review your request.",
        }
    }
}

/// IDs of the accounts that have blocked `viewer_id`. Empty for anonymous viewers.
pub(crate) async fn blockers_of(
    blocking_repo: &BlockingRepository,
    viewer_id: Option<&str>,
) -> AppResult<HashSet<String>> {
    match viewer_id {
        Some(id) => Ok(blocking_repo.find_blocker_ids(id).await?.into_iter().collect()),
        None => Ok(HashSet::new()),
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
        unblock_request_repo: UnblockRequestRepository,
    ) -> Self {
        Self {
            user_repo,
            blocking_repo,
            unblock_request_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new active account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if input.password != input.password2 {
            return Err(AppError::Validation("Passwords don't match".to_string()));
        }

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            can_use_rich_editor: Set(false),
            rich_editor_requested: Set(false),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// The caller's own profile.
    #[must_use]
    pub fn get_profile(&self, user: user::Model) -> UserResponse {
        UserResponse::from_model(user, false)
    }

    /// Apply a partial update to the caller's profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<UserResponse> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(non_empty(bio));
        }
        if let Some(location) = input.location {
            active.location = Set(non_empty(location));
        }
        if let Some(website) = input.website {
            active.website = Set(non_empty(website));
        }
        if let Some(date_of_birth) = input.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }

        active.profile_picture = match (input.remove_profile_picture, input.profile_picture) {
            (true, _) => Set(None),
            (false, Some(url)) => Set(Some(url)),
            (false, None) => NotSet,
        };
        active.cover_photo = match (input.remove_cover_photo, input.cover_photo) {
            (true, _) => Set(None),
            (false, Some(url)) => Set(Some(url)),
            (false, None) => NotSet,
        };

        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        Ok(UserResponse::from_model(updated, false))
    }

    /// Look up an account as seen by `viewer_id`.
    pub async fn get_user(&self, viewer_id: Option<&str>, id: &str) -> AppResult<UserResponse> {
        let user = self.user_repo.get_by_id(id).await?;

        let has_blocked_me = match viewer_id {
            Some(viewer) if viewer != id => self.blocking_repo.is_blocking(id, viewer).await?,
            _ => false,
        };

        Ok(UserResponse::from_model(user, has_blocked_me))
    }

    /// Ask the moderators for rich text editor access.
    pub async fn request_rich_editor_access(
        &self,
        user: user::Model,
    ) -> AppResult<RichEditorRequest> {
        if user.has_rich_editor_access() {
            return Ok(RichEditorRequest::AlreadyGranted);
        }
        if user.rich_editor_requested {
            return Ok(RichEditorRequest::AlreadyRequested);
        }

        let user_id = user.id.clone();
        let mut active: user::ActiveModel = user.into();
        active.rich_editor_requested = Set(true);
        active.rich_editor_request_date = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await?;

        info!(user_id = %user_id, "Rich editor access requested");
        Ok(RichEditorRequest::Requested)
    }

    /// Withdraw a pending rich text editor request.
    pub async fn cancel_rich_editor_request(&self, user: user::Model) -> AppResult<()> {
        if !user.rich_editor_requested {
            return Err(AppError::BadRequest(
                "No pending rich editor request".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.rich_editor_requested = Set(false);
        active.rich_editor_request_date = Set(None);
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// File an appeal against deactivation.
    pub async fn request_unblock(
        &self,
        user: &user::Model,
        message: &str,
    ) -> AppResult<unblock_request::Model> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::BadRequest("Message is required".to_string()));
        }
        if user.is_active {
            return Err(AppError::BadRequest(
                "Your account is not deactivated".to_string(),
            ));
        }
        if self
            .unblock_request_repo
            .find_pending_for_user(&user.id)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(
                "You already have a pending unblock request".to_string(),
            ));
        }

        let model = unblock_request::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user.id.clone()),
            message: Set(message.to_string()),
            status: Set(unblock_request::UnblockRequestStatus::Pending),
            created_at: Set(Utc::now().into()),
            reviewed_at: Set(None),
            reviewed_by_id: Set(None),
            admin_notes: Set(None),
        };

        let request = self.unblock_request_repo.create(model).await?;
        info!(user_id = %user.id, request_id = %request.id, "Unblock request filed");
        Ok(request)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

/// Hash a password with Argon2.
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
