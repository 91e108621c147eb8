//! Friendship repository.

use std::sync::Arc;

use crate::entities::{
    Friendship,
    friendship::{self, FriendshipStatus},
};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder,
};

/// Friendship repository for database operations.
#[derive(Clone)]
pub struct FriendshipRepository {
    db: Arc<DatabaseConnection>,
}

/// Rows where `user_a` and `user_b` are the two parties, in either direction.
fn between(user_a: &str, user_b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friendship::Column::FromUserId.eq(user_a))
                .add(friendship::Column::ToUserId.eq(user_b)),
        )
        .add(
            Condition::all()
                .add(friendship::Column::FromUserId.eq(user_b))
                .add(friendship::Column::ToUserId.eq(user_a)),
        )
}

/// Rows where `user_id` is either party.
fn involving(user_id: &str) -> Condition {
    Condition::any()
        .add(friendship::Column::FromUserId.eq(user_id))
        .add(friendship::Column::ToUserId.eq(user_id))
}

impl FriendshipRepository {
    /// Create a new friendship repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the underlying connection, for opening transactions.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find a friendship by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        Self::find_by_id_with(self.db.as_ref(), id).await
    }

    /// Find a friendship by ID on the given connection or transaction.
    pub async fn find_by_id_with<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the friendship between two users, whichever side initiated it.
    pub async fn find_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Self::find_between_with(self.db.as_ref(), user_a, user_b).await
    }

    /// Find the friendship between two users on the given connection or transaction.
    pub async fn find_between_with<C: ConnectionTrait>(
        conn: &C,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(between(user_a, user_b))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accepted friendships involving `user_id`.
    pub async fn find_accepted(&self, user_id: &str) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(involving(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Accepted))
            .order_by_asc(friendship::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every friendship row involving `user_id`, whatever its status, oldest first.
    pub async fn find_involving(&self, user_id: &str) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(involving(user_id))
            .order_by_asc(friendship::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a friendship on the given connection or transaction.
    ///
    /// A unique-index violation (a concurrent request for the same pair)
    /// surfaces as [`AppError::Conflict`].
    pub async fn create_with<C: ConnectionTrait>(
        conn: &C,
        model: friendship::ActiveModel,
    ) -> AppResult<friendship::Model> {
        model.insert(conn).await.map_err(|e| AppError::from_db(&e))
    }

    /// Update a friendship.
    pub async fn update(&self, model: friendship::ActiveModel) -> AppResult<friendship::Model> {
        Self::update_with(self.db.as_ref(), model).await
    }

    /// Update a friendship on the given connection or transaction.
    ///
    /// A row deleted since it was read yields [`AppError::NotFound`].
    pub async fn update_with<C: ConnectionTrait>(
        conn: &C,
        model: friendship::ActiveModel,
    ) -> AppResult<friendship::Model> {
        model.update(conn).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Friendship not found".to_string()),
            e => AppError::from_db(&e),
        })
    }

    /// Delete a friendship by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Friendship::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every friendship between two users. Returns the number removed.
    pub async fn delete_between_with<C: ConnectionTrait>(
        conn: &C,
        user_a: &str,
        user_b: &str,
    ) -> AppResult<u64> {
        let result = Friendship::delete_many()
            .filter(between(user_a, user_b))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete the pending requests `user_id` sent or received.
    pub async fn delete_pending_involving_with<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
    ) -> AppResult<u64> {
        let result = Friendship::delete_many()
            .filter(involving(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Pending))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_friendship(
        id: &str,
        from: &str,
        to: &str,
        status: FriendshipStatus,
    ) -> friendship::Model {
        friendship::Model {
            id: id.to_string(),
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            status,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_between_returns_reverse_direction() {
        let row = create_test_friendship("f1", "user2", "user1", FriendshipStatus::Pending);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let found = repo.find_between("user1", "user2").await.unwrap();

        assert_eq!(found, Some(row));
    }

    #[tokio::test]
    async fn test_find_accepted() {
        let rows = vec![
            create_test_friendship("f1", "user1", "user2", FriendshipStatus::Accepted),
            create_test_friendship("f2", "user3", "user1", FriendshipStatus::Accepted),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let found = repo.find_accepted("user1").await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|f| f.involves("user1")));
    }

    #[tokio::test]
    async fn test_update_of_vanished_row_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friendship::Model>::new()])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let mut active: friendship::ActiveModel =
            create_test_friendship("f1", "user1", "user2", FriendshipStatus::Pending).into();
        active.status = sea_orm::Set(FriendshipStatus::Accepted);
        let result = repo.update(active).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_between_counts_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let removed = FriendshipRepository::delete_between_with(&db, "user1", "user2")
            .await
            .unwrap();

        assert_eq!(removed, 1);
    }
}
