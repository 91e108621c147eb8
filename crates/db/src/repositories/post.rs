//! Post repository.

use std::sync::Arc;

use super::BlockingRepository;
use crate::entities::{Post, post, user};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, Select, sea_query::JoinType,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Posts whose author is active and, for a signed-in viewer, not blocked
    /// by the viewer.
    fn visible_to(viewer_id: Option<&str>) -> Select<Post> {
        let mut query = Post::find()
            .join(JoinType::InnerJoin, post::Relation::Author.def())
            .filter(user::Column::IsActive.eq(true));

        if let Some(viewer_id) = viewer_id {
            query = query.filter(
                post::Column::AuthorId
                    .not_in_subquery(BlockingRepository::blocked_ids_query(viewer_id)),
            );
        }

        query
    }

    /// Find a post by ID, regardless of visibility.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post by ID, returning [`AppError::PostNotFound`] if absent.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a post by ID if it is visible to the viewer.
    pub async fn find_visible_by_id(
        &self,
        id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Option<post::Model>> {
        Self::visible_to(viewer_id)
            .filter(post::Column::Id.eq(id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All posts visible to the viewer, newest first.
    pub async fn find_visible(&self, viewer_id: Option<&str>) -> AppResult<Vec<post::Model>> {
        Self::visible_to(viewer_id)
            .order_by_desc(post::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post. Comments and likes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
