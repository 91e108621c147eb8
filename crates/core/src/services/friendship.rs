//! Friendship service.
//!
//! The social graph: friend requests, their resolution, and the
//! friends/pending/suggestions view of an account.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{
        friendship::{self, FriendshipStatus},
        user,
    },
    repositories::{BlockingRepository, FriendshipRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::user::{UserResponse, blockers_of};

/// Maximum number of friend suggestions returned by [`FriendshipService::categorize`].
pub const SUGGESTION_LIMIT: u64 = 20;

/// Social graph rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FriendshipError {
    #[error("Friendship not found")]
    NotFound,
    #[error("You cannot send a friend request to yourself")]
    SelfTarget,
    #[error("Cannot interact with this user")]
    Blocked,
    #[error("This account is deactivated")]
    Inactive,
    #[error("Already friends")]
    AlreadyFriends,
    #[error("Friend request already sent")]
    RequestAlreadyPending,
}

impl From<FriendshipError> for AppError {
    fn from(err: FriendshipError) -> Self {
        match err {
            FriendshipError::NotFound => Self::NotFound(err.to_string()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

/// Serialized friendship with both parties expanded.
#[derive(Debug, Clone, Serialize)]
pub struct FriendshipResponse {
    pub id: String,
    pub from_user: UserResponse,
    pub to_user: UserResponse,
    pub status: FriendshipStatus,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl FriendshipResponse {
    fn new(model: friendship::Model, from_user: UserResponse, to_user: UserResponse) -> Self {
        Self {
            id: model.id,
            from_user,
            to_user,
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Result of sending a friend request.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// A new relationship row was inserted.
    Created(FriendshipResponse),
    /// A previously rejected relationship was reopened in place.
    Revived(FriendshipResponse),
}

impl SendOutcome {
    #[must_use]
    pub fn into_response(self) -> FriendshipResponse {
        match self {
            Self::Created(r) | Self::Revived(r) => r,
        }
    }
}

/// What the caller asked for when resolving a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    Reject,
    Cancel,
}

/// Result of resolving a request.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// The initiator withdrew the request; the row is gone.
    Cancelled,
    /// The recipient declined the request.
    Rejected(FriendshipResponse),
}

/// Direction of a pending request relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Sent,
    Received,
}

/// One account in a [`FriendCategories`] bucket.
#[derive(Debug, Clone, Serialize)]
pub struct FriendEntry {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendship_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
    pub status: &'static str,
    pub category: &'static str,
    pub is_active: bool,
    pub has_blocked_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i_have_blocked: Option<bool>,
}

impl FriendEntry {
    fn new(user: &user::Model, status: &'static str, category: &'static str) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
            friendship_id: None,
            request_type: None,
            status,
            category,
            is_active: user.is_active,
            has_blocked_me: false,
            i_have_blocked: None,
        }
    }
}

/// The friends page of an account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FriendCategories {
    pub friends: Vec<FriendEntry>,
    pub pending: Vec<FriendEntry>,
    pub suggestions: Vec<FriendEntry>,
}

/// Friendship service for business logic.
#[derive(Clone)]
pub struct FriendshipService {
    friendship_repo: FriendshipRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl FriendshipService {
    /// Create a new friendship service.
    #[must_use]
    pub const fn new(
        friendship_repo: FriendshipRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            friendship_repo,
            user_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Send a friend request from `initiator_id` to `recipient_id`.
    ///
    /// A previously rejected relationship between the pair is reopened with
    /// the same ID and the caller as the new initiator.
    pub async fn send_request(
        &self,
        initiator_id: &str,
        recipient_id: &str,
    ) -> AppResult<SendOutcome> {
        let txn = self
            .friendship_repo
            .db()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let recipient = UserRepository::find_by_id_with(&txn, recipient_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(recipient_id.to_string()))?;

        if initiator_id == recipient_id {
            return Err(FriendshipError::SelfTarget.into());
        }

        let initiator = UserRepository::find_by_id_with(&txn, initiator_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(initiator_id.to_string()))?;

        if !initiator.is_active || !recipient.is_active {
            return Err(FriendshipError::Inactive.into());
        }

        if BlockingRepository::is_blocked_between_with(&txn, initiator_id, recipient_id).await? {
            return Err(FriendshipError::Blocked.into());
        }

        let now = Utc::now();
        let existing = FriendshipRepository::find_between_with(&txn, initiator_id, recipient_id).await?;

        let (model, revived) = match existing {
            Some(row) => match row.status {
                FriendshipStatus::Accepted => return Err(FriendshipError::AlreadyFriends.into()),
                FriendshipStatus::Pending => {
                    return Err(FriendshipError::RequestAlreadyPending.into());
                }
                FriendshipStatus::Rejected => {
                    let mut active: friendship::ActiveModel = row.into();
                    active.from_user_id = Set(initiator_id.to_string());
                    active.to_user_id = Set(recipient_id.to_string());
                    active.status = Set(FriendshipStatus::Pending);
                    active.updated_at = Set(Some(now.into()));
                    (FriendshipRepository::update_with(&txn, active).await?, true)
                }
            },
            None => {
                let active = friendship::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    from_user_id: Set(initiator_id.to_string()),
                    to_user_id: Set(recipient_id.to_string()),
                    status: Set(FriendshipStatus::Pending),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                };
                (FriendshipRepository::create_with(&txn, active).await?, false)
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            friendship_id = %model.id,
            from = %initiator_id,
            to = %recipient_id,
            revived,
            "Friend request sent"
        );

        let response = FriendshipResponse::new(
            model,
            UserResponse::from_model(initiator, false),
            UserResponse::from_model(recipient, false),
        );
        Ok(if revived {
            SendOutcome::Revived(response)
        } else {
            SendOutcome::Created(response)
        })
    }

    /// Accept a pending request addressed to `recipient_id`.
    pub async fn accept(
        &self,
        recipient_id: &str,
        friendship_id: &str,
    ) -> AppResult<FriendshipResponse> {
        let row = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .filter(|f| f.to_user_id == recipient_id && f.status == FriendshipStatus::Pending)
            .ok_or(FriendshipError::NotFound)?;

        if self
            .blocking_repo
            .is_blocked_between(&row.from_user_id, &row.to_user_id)
            .await?
        {
            return Err(FriendshipError::Blocked.into());
        }

        let initiator = self.user_repo.get_by_id(&row.from_user_id).await?;
        if !initiator.is_active {
            return Err(FriendshipError::Inactive.into());
        }

        let mut active: friendship::ActiveModel = row.into();
        active.status = Set(FriendshipStatus::Accepted);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.friendship_repo.update(active).await?;

        info!(friendship_id = %updated.id, "Friend request accepted");
        self.to_response(Some(recipient_id), updated).await
    }

    /// Reject or cancel a request.
    ///
    /// The initiator always deletes the row. The recipient marks it rejected.
    pub async fn resolve(
        &self,
        caller_id: &str,
        friendship_id: &str,
        action: ResolveAction,
    ) -> AppResult<ResolveOutcome> {
        let row = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .filter(|f| crate::policy::is_party(caller_id, f))
            .ok_or(FriendshipError::NotFound)?;

        if row.from_user_id == caller_id {
            self.friendship_repo.delete(&row.id).await?;
            info!(friendship_id = %row.id, ?action, "Friend request cancelled");
            return Ok(ResolveOutcome::Cancelled);
        }

        let model = match row.status {
            FriendshipStatus::Accepted => return Err(FriendshipError::AlreadyFriends.into()),
            FriendshipStatus::Rejected => row,
            FriendshipStatus::Pending => {
                let mut active: friendship::ActiveModel = row.into();
                active.status = Set(FriendshipStatus::Rejected);
                active.updated_at = Set(Some(Utc::now().into()));
                let updated = self.friendship_repo.update(active).await?;
                info!(friendship_id = %updated.id, "Friend request rejected");
                updated
            }
        };

        Ok(ResolveOutcome::Rejected(
            self.to_response(Some(caller_id), model).await?,
        ))
    }

    /// End an accepted friendship.
    pub async fn unfriend(&self, caller_id: &str, friendship_id: &str) -> AppResult<()> {
        let row = self
            .friendship_repo
            .find_by_id(friendship_id)
            .await?
            .filter(|f| f.status == FriendshipStatus::Accepted && crate::policy::is_party(caller_id, f))
            .ok_or(FriendshipError::NotFound)?;

        self.friendship_repo.delete(&row.id).await?;
        info!(friendship_id = %row.id, by = %caller_id, "Friendship removed");
        Ok(())
    }

    /// Accepted friendships of `user_id`.
    pub async fn list_friendships(&self, user_id: &str) -> AppResult<Vec<FriendshipResponse>> {
        let rows = self.friendship_repo.find_accepted(user_id).await?;

        let ids: Vec<String> = rows.iter().map(|f| f.other_party(user_id).to_string()).collect();
        let mut users = self.users_by_id(&ids).await?;
        let me = self.user_repo.get_by_id(user_id).await?;
        users.insert(me.id.clone(), me);

        let blockers = blockers_of(&self.blocking_repo, Some(user_id)).await?;
        let view = |id: &str| users.get(id).cloned().map(|u| UserResponse::for_viewer(u, &blockers));

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let from = view(&row.from_user_id)?;
                let to = view(&row.to_user_id)?;
                Some(FriendshipResponse::new(row, from, to))
            })
            .collect())
    }

    /// Split the accounts around `user_id` into friends, pending requests, and suggestions.
    pub async fn categorize(&self, user_id: &str) -> AppResult<FriendCategories> {
        let rows = self.friendship_repo.find_involving(user_id).await?;

        let related: Vec<String> = rows.iter().map(|f| f.other_party(user_id).to_string()).collect();
        let users = self.users_by_id(&related).await?;

        let blockers = blockers_of(&self.blocking_repo, Some(user_id)).await?;
        let blocked: HashSet<String> = self
            .blocking_repo
            .find_blocked_ids(user_id)
            .await?
            .into_iter()
            .collect();

        let mut categories = FriendCategories::default();
        let mut received = Vec::new();

        for row in &rows {
            let Some(other) = users.get(row.other_party(user_id)) else {
                continue;
            };

            match row.status {
                FriendshipStatus::Accepted => {
                    let mut entry = FriendEntry::new(other, "accepted", "friends");
                    entry.friendship_id = Some(row.id.clone());
                    entry.has_blocked_me = blockers.contains(&other.id);
                    categories.friends.push(entry);
                }
                FriendshipStatus::Pending => {
                    let mut entry = FriendEntry::new(other, "pending", "pending");
                    entry.friendship_id = Some(row.id.clone());
                    entry.has_blocked_me = blockers.contains(&other.id);
                    if row.from_user_id == user_id {
                        entry.request_type = Some(RequestType::Sent);
                        categories.pending.push(entry);
                    } else {
                        entry.request_type = Some(RequestType::Received);
                        received.push(entry);
                    }
                }
                FriendshipStatus::Rejected => {}
            }
        }
        categories.pending.extend(received);

        categories.suggestions = self
            .user_repo
            .find_active_excluding(user_id, &related, SUGGESTION_LIMIT)
            .await?
            .iter()
            .map(|u| {
                let mut entry = FriendEntry::new(u, "none", "suggestions");
                entry.has_blocked_me = blockers.contains(&u.id);
                entry.i_have_blocked = Some(blocked.contains(&u.id));
                entry
            })
            .collect();

        Ok(categories)
    }

    async fn users_by_id(&self, ids: &[String]) -> AppResult<HashMap<String, user::Model>> {
        Ok(self
            .user_repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }

    async fn to_response(
        &self,
        viewer_id: Option<&str>,
        model: friendship::Model,
    ) -> AppResult<FriendshipResponse> {
        let mut users = self
            .users_by_id(&[model.from_user_id.clone(), model.to_user_id.clone()])
            .await?;
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        let mut take = |id: &str| {
            users
                .remove(id)
                .map(|u| UserResponse::for_viewer(u, &blockers))
                .ok_or_else(|| AppError::UserNotFound(id.to_string()))
        };
        let from = take(&model.from_user_id)?;
        let to = take(&model.to_user_id)?;
        Ok(FriendshipResponse::new(model, from, to))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::test_support;
    use lookbook_db::entities::blocking;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_service(db: DatabaseConnection) -> FriendshipService {
        let db = Arc::new(db);
        FriendshipService::new(
            FriendshipRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            BlockingRepository::new(db),
        )
    }

    fn row(id: &str, from: &str, to: &str, status: FriendshipStatus) -> friendship::Model {
        friendship::Model {
            id: id.to_string(),
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn no_blocks() -> Vec<blocking::Model> {
        Vec::new()
    }

    fn no_friendships() -> Vec<friendship::Model> {
        Vec::new()
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            AppError::from(FriendshipError::NotFound),
            AppError::NotFound(_)
        ));
        let err = AppError::from(FriendshipError::RequestAlreadyPending);
        assert_eq!(err.status_code().as_u16(), 400);
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Friend request already sent"));
    }

    #[tokio::test]
    async fn test_send_request_creates_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([no_blocks()])
            .append_query_results([no_friendships()])
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        let outcome = service.send_request("alice", "bob").await.unwrap();
        match outcome {
            SendOutcome::Created(r) => {
                assert_eq!(r.from_user.id, "alice");
                assert_eq!(r.to_user.id, "bob");
                assert_eq!(r.status, FriendshipStatus::Pending);
            }
            other => panic!("Expected Created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_request_to_self() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("alice")]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_send_request_unknown_recipient() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_send_request_to_inactive_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::inactive("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "bob").await.unwrap_err();
        assert_eq!(err.to_string(), "Conflict: This account is deactivated");
    }

    #[tokio::test]
    async fn test_send_request_when_blocked() {
        let block = blocking::Model {
            id: "b1".to_string(),
            blocker_id: "bob".to_string(),
            blocked_id: "alice".to_string(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([[block]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == FriendshipError::Blocked.to_string()));
    }

    #[tokio::test]
    async fn test_send_request_already_pending_in_reverse() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([no_blocks()])
            .append_query_results([[row("f1", "bob", "alice", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Friend request already sent"));
    }

    #[tokio::test]
    async fn test_send_request_already_friends() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([no_blocks()])
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Accepted)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.send_request("alice", "bob").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Already friends"));
    }

    #[tokio::test]
    async fn test_send_request_revives_rejected_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_support::user("bob")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([no_blocks()])
            .append_query_results([[row("f1", "bob", "alice", FriendshipStatus::Rejected)]])
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        match service.send_request("alice", "bob").await.unwrap() {
            SendOutcome::Revived(r) => {
                assert_eq!(r.id, "f1");
                assert_eq!(r.from_user.id, "alice");
            }
            other => panic!("Expected Revived, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_by_initiator_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.accept("alice", "f1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_accept() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .append_query_results([no_blocks()])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Accepted)]])
            .append_query_results([[test_support::user("alice"), test_support::user("bob")]])
            .append_query_results([no_blocks()])
            .into_connection();
        let service = create_test_service(db);

        let response = service.accept("bob", "f1").await.unwrap();
        assert_eq!(response.status, FriendshipStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_after_concurrent_cancel_is_not_found() {
        // the initiator deletes the row between the read and the update
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .append_query_results([no_blocks()])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([Vec::<friendship::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let err = service.accept("bob", "f1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reject_after_concurrent_cancel_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .append_query_results([Vec::<friendship::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let err = service
            .resolve("bob", "f1", ResolveAction::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_by_initiator_cancels() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = create_test_service(db);

        let outcome = service
            .resolve("alice", "f1", ResolveAction::Reject)
            .await
            .unwrap();
        assert!(matches!(outcome, ResolveOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_resolve_by_outsider_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service
            .resolve("carol", "f1", ResolveAction::Cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recipient_cannot_reject_accepted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Accepted)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service
            .resolve("bob", "f1", ResolveAction::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Already friends"));
    }

    #[tokio::test]
    async fn test_unfriend_requires_accepted() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row("f1", "alice", "bob", FriendshipStatus::Pending)]])
            .into_connection();
        let service = create_test_service(db);

        let err = service.unfriend("bob", "f1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_categorize() {
        let rows = vec![
            row("f1", "alice", "bob", FriendshipStatus::Accepted),
            row("f2", "carol", "alice", FriendshipStatus::Pending),
            row("f3", "alice", "dave", FriendshipStatus::Pending),
            row("f4", "erin", "alice", FriendshipStatus::Rejected),
        ];
        let related = vec![
            test_support::user("bob"),
            test_support::user("carol"),
            test_support::user("dave"),
            test_support::user("erin"),
        ];
        let bob_blocks_alice = blocking::Model {
            id: "b1".to_string(),
            blocker_id: "bob".to_string(),
            blocked_id: "alice".to_string(),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows])
            .append_query_results([related])
            .append_query_results([[maplit::btreemap! {
                "blocker_id" => sea_orm::Value::String(Some(Box::new(bob_blocks_alice.blocker_id.clone()))),
            }]])
            .append_query_results([[maplit::btreemap! {
                "blocked_id" => sea_orm::Value::String(Some(Box::new("frank".to_string()))),
            }]])
            .append_query_results([[test_support::user("frank")]])
            .into_connection();
        let service = create_test_service(db);

        let categories = service.categorize("alice").await.unwrap();

        assert_eq!(categories.friends.len(), 1);
        assert_eq!(categories.friends[0].id, "bob");
        assert_eq!(categories.friends[0].friendship_id.as_deref(), Some("f1"));
        assert!(categories.friends[0].has_blocked_me);

        let pending: Vec<_> = categories
            .pending
            .iter()
            .map(|e| (e.id.as_str(), e.request_type))
            .collect();
        assert_eq!(
            pending,
            [
                ("dave", Some(RequestType::Sent)),
                ("carol", Some(RequestType::Received)),
            ]
        );

        assert_eq!(categories.suggestions.len(), 1);
        assert_eq!(categories.suggestions[0].status, "none");
        assert_eq!(categories.suggestions[0].i_have_blocked, Some(true));
        assert!(categories.suggestions[0].friendship_id.is_none());
    }
}
