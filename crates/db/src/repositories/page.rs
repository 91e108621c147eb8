//! Page repository.
//!
//! Covers pages together with their follower and admin join tables.

use std::sync::Arc;

use super::BlockingRepository;
use crate::entities::{Page, PageAdmin, PageFollower, page, page_admin, page_follower, user};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, sea_query::JoinType,
};

/// Page repository for database operations.
#[derive(Clone)]
pub struct PageRepository {
    db: Arc<DatabaseConnection>,
}

impl PageRepository {
    /// Create a new page repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Pages ====================

    /// Pages whose owner is active and, for a signed-in viewer, not blocked
    /// by the viewer.
    pub(crate) fn visible_to(viewer_id: Option<&str>) -> Select<Page> {
        let mut query = Page::find()
            .join(JoinType::InnerJoin, page::Relation::Owner.def())
            .filter(user::Column::IsActive.eq(true));

        if let Some(viewer_id) = viewer_id {
            query = query.filter(
                page::Column::OwnerId
                    .not_in_subquery(BlockingRepository::blocked_ids_query(viewer_id)),
            );
        }

        query
    }

    /// Find a page by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<page::Model>> {
        Page::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a page by its unique username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<page::Model>> {
        Page::find()
            .filter(page::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a page by username if it is visible to the viewer.
    pub async fn find_visible_by_username(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Option<page::Model>> {
        Self::visible_to(viewer_id)
            .filter(page::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find pages by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<page::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Page::find()
            .filter(page::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All pages visible to the viewer, newest first.
    pub async fn find_visible(&self, viewer_id: Option<&str>) -> AppResult<Vec<page::Model>> {
        Self::visible_to(viewer_id)
            .order_by_desc(page::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pages owned by a user, newest first.
    pub async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<page::Model>> {
        Page::find()
            .filter(page::Column::OwnerId.eq(owner_id))
            .order_by_desc(page::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new page. A taken username surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: page::ActiveModel) -> AppResult<page::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::from_db(&e))
    }

    /// Update a page.
    pub async fn update(&self, model: page::ActiveModel) -> AppResult<page::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::from_db(&e))
    }

    /// Delete a page. Followers, admins and page posts cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Page::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ==================== Followers ====================

    /// Find a follow by page and user.
    pub async fn find_follower(
        &self,
        page_id: &str,
        user_id: &str,
    ) -> AppResult<Option<page_follower::Model>> {
        PageFollower::find()
            .filter(page_follower::Column::PageId.eq(page_id))
            .filter(page_follower::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the user follows the page.
    pub async fn is_following(&self, page_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.find_follower(page_id, user_id).await?.is_some())
    }

    /// Follows of a page, oldest first.
    pub async fn find_followers(&self, page_id: &str) -> AppResult<Vec<page_follower::Model>> {
        PageFollower::find()
            .filter(page_follower::Column::PageId.eq(page_id))
            .order_by_asc(page_follower::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of followers of a page.
    pub async fn count_followers(&self, page_id: &str) -> AppResult<u64> {
        PageFollower::find()
            .filter(page_follower::Column::PageId.eq(page_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a follower.
    pub async fn add_follower(
        &self,
        model: page_follower::ActiveModel,
    ) -> AppResult<page_follower::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::from_db(&e))
    }

    /// Remove a follow by ID.
    pub async fn remove_follower(&self, id: &str) -> AppResult<()> {
        PageFollower::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ==================== Admins ====================

    /// Find an admin record by page and user.
    pub async fn find_admin(
        &self,
        page_id: &str,
        user_id: &str,
    ) -> AppResult<Option<page_admin::Model>> {
        PageAdmin::find()
            .filter(page_admin::Column::PageId.eq(page_id))
            .filter(page_admin::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the user is listed as a page admin (any role).
    pub async fn is_admin(&self, page_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.find_admin(page_id, user_id).await?.is_some())
    }

    /// Add a page admin.
    pub async fn add_admin(&self, model: page_admin::ActiveModel) -> AppResult<page_admin::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::from_db(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    #[tokio::test]
    async fn test_is_following() {
        let follow = page_follower::Model {
            id: "pf1".to_string(),
            page_id: "page1".to_string(),
            user_id: "user1".to_string(),
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[follow]])
                .into_connection(),
        );

        let repo = PageRepository::new(db);
        assert!(repo.is_following("page1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_followers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .into_connection(),
        );

        let repo = PageRepository::new(db);
        assert_eq!(repo.count_followers("page1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_by_username_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<page::Model>::new()])
                .into_connection(),
        );

        let repo = PageRepository::new(db);
        assert!(repo.find_by_username("nope").await.unwrap().is_none());
    }

    #[test]
    fn test_visible_to_filters_inactive_and_blocked_owners() {
        let sql = PageRepository::visible_to(Some("bob"))
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"INNER JOIN "user""#));
        assert!(sql.contains(r#""user"."is_active""#));
        assert!(sql.contains(r#""page"."owner_id" NOT IN (SELECT "blocked_id" FROM "blocking""#));
        assert!(sql.contains("'bob'"));
    }

    #[test]
    fn test_visible_to_anonymous_skips_block_filter() {
        let sql = PageRepository::visible_to(None)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""user"."is_active""#));
        assert!(!sql.contains("blocking"));
    }
}
