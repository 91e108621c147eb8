//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the underlying connection, for opening transactions.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        Self::find_by_id_with(self.db.as_ref(), id).await
    }

    /// Find a user by ID on the given connection or transaction.
    pub async fn find_by_id_with<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by ID, returning [`AppError::UserNotFound`] if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find users by IDs, in storage order.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username (exact match).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        Self::find_by_username_with(self.db.as_ref(), username).await
    }

    /// Find a user by username on the given connection or transaction.
    pub async fn find_by_username_with<C: ConnectionTrait>(
        conn: &C,
        username: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether any superuser exists.
    pub async fn superuser_exists(&self) -> AppResult<bool> {
        let found = User::find()
            .filter(user::Column::IsSuperuser.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Active users other than `user_id` and the excluded IDs, up to `limit`.
    pub async fn find_active_excluding(
        &self,
        user_id: &str,
        exclude: &[String],
        limit: u64,
    ) -> AppResult<Vec<user::Model>> {
        let mut query = User::find()
            .filter(user::Column::IsActive.eq(true))
            .filter(user::Column::Id.ne(user_id));

        if !exclude.is_empty() {
            query = query.filter(user::Column::Id.is_not_in(exclude.to_vec()));
        }

        query
            .order_by_asc(user::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        Self::create_with(self.db.as_ref(), model).await
    }

    /// Create a new user on the given connection or transaction.
    pub async fn create_with<C: ConnectionTrait>(
        conn: &C,
        model: user::ActiveModel,
    ) -> AppResult<user::Model> {
        model.insert(conn).await.map_err(|e| AppError::from_db(&e))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        Self::update_with(self.db.as_ref(), model).await
    }

    /// Update a user on the given connection or transaction.
    pub async fn update_with<C: ConnectionTrait>(
        conn: &C,
        model: user::ActiveModel,
    ) -> AppResult<user::Model> {
        model.update(conn).await.map_err(|e| AppError::from_db(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: None,
            profile_picture: None,
            cover_photo: None,
            date_of_birth: None,
            location: None,
            website: None,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            can_use_rich_editor: false,
            rich_editor_requested: false,
            rich_editor_request_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_user_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("nobody").await;

        assert!(matches!(result, Err(AppError::UserNotFound(id)) if id == "nobody"));
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let alice = create_test_user("u1", "alice");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[alice.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let found = repo.find_by_username("alice").await.unwrap();

        assert_eq!(found, Some(alice));
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let users = repo.find_by_ids(&[]).await.unwrap();

        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_superuser_exists() {
        let mut admin = create_test_user("u1", "admin");
        admin.is_superuser = true;
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[admin]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.superuser_exists().await.unwrap());
    }
}
