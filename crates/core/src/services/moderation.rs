//! Moderation service: account activation, rich editor grants, and unblock appeals.

use std::collections::HashMap;

use chrono::Utc;
use lookbook_common::{AppError, AppResult};
use lookbook_db::{
    entities::{
        unblock_request::{self, UnblockRequestStatus},
        user,
    },
    repositories::{FriendshipRepository, UnblockRequestRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::user::UserResponse;
use crate::policy;

/// Moderator decision on an unblock request.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Response for an unblock request.
#[derive(Debug, Clone, Serialize)]
pub struct UnblockRequestResponse {
    pub id: String,
    pub user: UserResponse,
    pub message: String,
    pub status: UnblockRequestStatus,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by_id: Option<String>,
    pub admin_notes: Option<String>,
}

impl UnblockRequestResponse {
    fn new(request: unblock_request::Model, user: UserResponse) -> Self {
        Self {
            id: request.id,
            user,
            message: request.message,
            status: request.status,
            created_at: request.created_at.to_rfc3339(),
            reviewed_at: request.reviewed_at.map(|t| t.to_rfc3339()),
            reviewed_by_id: request.reviewed_by_id,
            admin_notes: request.admin_notes,
        }
    }
}

/// Moderation service for staff-only account management.
#[derive(Clone)]
pub struct ModerationService {
    user_repo: UserRepository,
    unblock_request_repo: UnblockRequestRepository,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        unblock_request_repo: UnblockRequestRepository,
    ) -> Self {
        Self {
            user_repo,
            unblock_request_repo,
        }
    }

    // ========== Accounts ==========

    /// Deactivate an account and drop its pending friend requests.
    pub async fn deactivate(&self, moderator: &user::Model, user_id: &str) -> AppResult<UserResponse> {
        policy::require_moderator(moderator)?;

        let target = self.user_repo.get_by_id(user_id).await?;
        if target.is_superuser {
            return Err(AppError::BadRequest(
                "Cannot deactivate a superuser".to_string(),
            ));
        }

        let txn = self
            .user_repo
            .db()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let dropped = FriendshipRepository::delete_pending_involving_with(&txn, user_id).await?;

        let mut active: user::ActiveModel = target.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = UserRepository::update_with(&txn, active).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            user_id = %user_id,
            moderator = %moderator.id,
            pending_requests_removed = dropped,
            "Deactivated user"
        );
        Ok(UserResponse::from_model(updated, false))
    }

    /// Reactivate an account.
    pub async fn activate(&self, moderator: &user::Model, user_id: &str) -> AppResult<UserResponse> {
        policy::require_moderator(moderator)?;

        let target = self.user_repo.get_by_id(user_id).await?;
        let updated = self.set_active(target, true).await?;

        info!(user_id = %user_id, moderator = %moderator.id, "Activated user");
        Ok(UserResponse::from_model(updated, false))
    }

    /// Grant rich editor access and clear any pending request.
    pub async fn grant_rich_editor(
        &self,
        moderator: &user::Model,
        user_id: &str,
    ) -> AppResult<UserResponse> {
        self.set_rich_editor(moderator, user_id, true).await
    }

    /// Revoke rich editor access and clear any pending request.
    pub async fn revoke_rich_editor(
        &self,
        moderator: &user::Model,
        user_id: &str,
    ) -> AppResult<UserResponse> {
        self.set_rich_editor(moderator, user_id, false).await
    }

    async fn set_rich_editor(
        &self,
        moderator: &user::Model,
        user_id: &str,
        granted: bool,
    ) -> AppResult<UserResponse> {
        policy::require_moderator(moderator)?;

        let target = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = target.into();
        active.can_use_rich_editor = Set(granted);
        active.rich_editor_requested = Set(false);
        active.rich_editor_request_date = Set(None);
        let updated = self.user_repo.update(active).await?;

        info!(user_id = %user_id, moderator = %moderator.id, granted, "Changed rich editor access");
        Ok(UserResponse::from_model(updated, false))
    }

    async fn set_active(&self, target: user::Model, is_active: bool) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = target.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await
    }

    // ========== Unblock Requests ==========

    /// Pending unblock requests, oldest first.
    pub async fn list_unblock_requests(
        &self,
        moderator: &user::Model,
    ) -> AppResult<Vec<UnblockRequestResponse>> {
        policy::require_moderator(moderator)?;

        let requests = self.unblock_request_repo.find_pending().await?;
        let ids: Vec<String> = requests.iter().map(|r| r.user_id.clone()).collect();
        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(requests
            .into_iter()
            .filter_map(|r| {
                let user = users.get(&r.user_id)?.clone();
                Some(UnblockRequestResponse::new(r, UserResponse::from_model(user, false)))
            })
            .collect())
    }

    /// Approve an appeal and reactivate the account.
    pub async fn approve_unblock_request(
        &self,
        moderator: &user::Model,
        request_id: &str,
        input: ReviewInput,
    ) -> AppResult<UnblockRequestResponse> {
        policy::require_moderator(moderator)?;

        let request = self.get_pending_request(request_id).await?;
        let target = self.user_repo.get_by_id(&request.user_id).await?;
        let user = self.set_active(target, true).await?;

        let reviewed = self
            .review(request, moderator, UnblockRequestStatus::Approved, input)
            .await?;

        info!(request_id = %reviewed.id, user_id = %user.id, moderator = %moderator.id, "Approved unblock request");
        Ok(UnblockRequestResponse::new(
            reviewed,
            UserResponse::from_model(user, false),
        ))
    }

    /// Reject an appeal. The account stays deactivated.
    pub async fn reject_unblock_request(
        &self,
        moderator: &user::Model,
        request_id: &str,
        input: ReviewInput,
    ) -> AppResult<UnblockRequestResponse> {
        policy::require_moderator(moderator)?;

        let request = self.get_pending_request(request_id).await?;
        let user = self.user_repo.get_by_id(&request.user_id).await?;

        let reviewed = self
            .review(request, moderator, UnblockRequestStatus::Rejected, input)
            .await?;

        info!(request_id = %reviewed.id, user_id = %user.id, moderator = %moderator.id, "Rejected unblock request");
        Ok(UnblockRequestResponse::new(
            reviewed,
            UserResponse::from_model(user, false),
        ))
    }

    async fn get_pending_request(&self, id: &str) -> AppResult<unblock_request::Model> {
        let request = self
            .unblock_request_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unblock request not found: {id}")))?;

        if request.status != UnblockRequestStatus::Pending {
            return Err(AppError::BadRequest(
                "This request has already been reviewed".to_string(),
            ));
        }
        Ok(request)
    }

    async fn review(
        &self,
        request: unblock_request::Model,
        moderator: &user::Model,
        status: UnblockRequestStatus,
        input: ReviewInput,
    ) -> AppResult<unblock_request::Model> {
        let mut active: unblock_request::ActiveModel = request.into();
        active.status = Set(status);
        active.reviewed_at = Set(Some(Utc::now().into()));
        active.reviewed_by_id = Set(Some(moderator.id.clone()));
        active.admin_notes = Set(input.admin_notes);
        self.unblock_request_repo.update(active).await
    }
}
