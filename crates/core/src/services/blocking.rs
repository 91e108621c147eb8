//! Blocking service.

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::blocking,
    repositories::{BlockingRepository, FriendshipRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use tracing::info;

use super::user::{UserResponse, blockers_of};

/// Result of a block request.
#[derive(Debug, Clone)]
pub enum BlockOutcome {
    Created(blocking::Model),
    AlreadyBlocked(blocking::Model),
}

impl BlockOutcome {
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Blocking service for business logic.
#[derive(Clone)]
pub struct BlockingService {
    blocking_repo: BlockingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl BlockingService {
    /// Create a new blocking service.
    #[must_use]
    pub const fn new(blocking_repo: BlockingRepository, user_repo: UserRepository) -> Self {
        Self {
            blocking_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Block a user, dropping every friendship between the two accounts.
    pub async fn block(&self, blocker_id: &str, target_id: &str) -> AppResult<BlockOutcome> {
        self.user_repo.get_by_id(target_id).await?;

        if blocker_id == target_id {
            return Err(AppError::BadRequest("You cannot block yourself".to_string()));
        }

        let txn = self
            .user_repo
            .db()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = FriendshipRepository::delete_between_with(&txn, blocker_id, target_id).await?;

        let outcome =
            match BlockingRepository::find_by_pair_with(&txn, blocker_id, target_id).await? {
                Some(existing) => BlockOutcome::AlreadyBlocked(existing),
                None => {
                    let model = blocking::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        blocker_id: Set(blocker_id.to_string()),
                        blocked_id: Set(target_id.to_string()),
                        created_at: Set(Utc::now().into()),
                    };
                    BlockOutcome::Created(BlockingRepository::create_with(&txn, model).await?)
                }
            };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            blocker = %blocker_id,
            blocked = %target_id,
            friendships_removed = removed,
            created = outcome.is_created(),
            "Blocked user"
        );
        Ok(outcome)
    }

    /// Remove a block.
    pub async fn unblock(&self, blocker_id: &str, target_id: &str) -> AppResult<()> {
        self.user_repo.get_by_id(target_id).await?;

        if !self.blocking_repo.delete_by_pair(blocker_id, target_id).await? {
            return Err(AppError::BadRequest("User is not blocked".to_string()));
        }

        info!(blocker = %blocker_id, blocked = %target_id, "Unblocked user");
        Ok(())
    }

    /// Accounts `blocker_id` has blocked, most recent block first.
    pub async fn list_blocked(&self, blocker_id: &str) -> AppResult<Vec<UserResponse>> {
        let blocks = self.blocking_repo.find_by_blocker(blocker_id).await?;
        let ids: Vec<String> = blocks.iter().map(|b| b.blocked_id.clone()).collect();

        let mut users = self.user_repo.find_by_ids(&ids).await?;
        let blockers = blockers_of(&self.blocking_repo, Some(blocker_id)).await?;

        let mut views = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(pos) = users.iter().position(|u| &u.id == id) {
                views.push(UserResponse::for_viewer(users.swap_remove(pos), &blockers));
            }
        }
        Ok(views)
    }
}
