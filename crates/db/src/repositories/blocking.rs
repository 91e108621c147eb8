//! Blocking repository.

use std::sync::Arc;

use crate::entities::{Blocking, blocking};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Query, SelectStatement},
};

/// Blocking repository for database operations.
#[derive(Clone)]
pub struct BlockingRepository {
    db: Arc<DatabaseConnection>,
}

impl BlockingRepository {
    /// Create a new blocking repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Subquery selecting the IDs `blocker_id` has blocked.
    ///
    /// Used to hide content authored by blocked users.
    #[must_use]
    pub fn blocked_ids_query(blocker_id: &str) -> SelectStatement {
        Query::select()
            .column(blocking::Column::BlockedId)
            .from(Blocking)
            .and_where(blocking::Column::BlockerId.eq(blocker_id))
            .to_owned()
    }

    /// Find a blocking relationship by blocker and blocked user.
    pub async fn find_by_pair(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> AppResult<Option<blocking::Model>> {
        Self::find_by_pair_with(self.db.as_ref(), blocker_id, blocked_id).await
    }

    /// Find a blocking relationship on the given connection or transaction.
    pub async fn find_by_pair_with<C: ConnectionTrait>(
        conn: &C,
        blocker_id: &str,
        blocked_id: &str,
    ) -> AppResult<Option<blocking::Model>> {
        Blocking::find()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .filter(blocking::Column::BlockedId.eq(blocked_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is blocking another user.
    pub async fn is_blocking(&self, blocker_id: &str, blocked_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(blocker_id, blocked_id).await?.is_some())
    }

    /// Check if either user is blocking the other.
    pub async fn is_blocked_between(&self, user_a: &str, user_b: &str) -> AppResult<bool> {
        Self::is_blocked_between_with(self.db.as_ref(), user_a, user_b).await
    }

    /// Check if either user is blocking the other, in one query.
    pub async fn is_blocked_between_with<C: ConnectionTrait>(
        conn: &C,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<bool> {
        let found = Blocking::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(blocking::Column::BlockerId.eq(user_a))
                            .add(blocking::Column::BlockedId.eq(user_b)),
                    )
                    .add(
                        Condition::all()
                            .add(blocking::Column::BlockerId.eq(user_b))
                            .add(blocking::Column::BlockedId.eq(user_a)),
                    ),
            )
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Create a new blocking relationship on the given connection or transaction.
    pub async fn create_with<C: ConnectionTrait>(
        conn: &C,
        model: blocking::ActiveModel,
    ) -> AppResult<blocking::Model> {
        model.insert(conn).await.map_err(|e| AppError::from_db(&e))
    }

    /// Delete a blocking relationship by pair. Returns whether a row was removed.
    pub async fn delete_by_pair(&self, blocker_id: &str, blocked_id: &str) -> AppResult<bool> {
        let result = Blocking::delete_many()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .filter(blocking::Column::BlockedId.eq(blocked_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Blocks created by `blocker_id`, newest first.
    pub async fn find_by_blocker(&self, blocker_id: &str) -> AppResult<Vec<blocking::Model>> {
        Blocking::find()
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .order_by_desc(blocking::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of the users who have blocked `user_id`.
    pub async fn find_blocker_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        Blocking::find()
            .select_only()
            .column(blocking::Column::BlockerId)
            .filter(blocking::Column::BlockedId.eq(user_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of the users `blocker_id` has blocked.
    pub async fn find_blocked_ids(&self, blocker_id: &str) -> AppResult<Vec<String>> {
        Blocking::find()
            .select_only()
            .column(blocking::Column::BlockedId)
            .filter(blocking::Column::BlockerId.eq(blocker_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
