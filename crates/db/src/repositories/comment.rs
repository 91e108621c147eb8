//! Comment repository.

use std::sync::Arc;

use super::BlockingRepository;
use crate::entities::{Comment, comment, user};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, sea_query::JoinType,
};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Comments written by active authors. Hidden and deleted comments are
    /// included; callers render them as placeholders.
    fn by_active_authors() -> Select<Comment> {
        Comment::find()
            .join(JoinType::InnerJoin, comment::Relation::Author.def())
            .filter(user::Column::IsActive.eq(true))
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments the viewer may read: active authors only and, for a
    /// signed-in viewer, none written by accounts the viewer has blocked.
    pub(crate) fn visible_to(viewer_id: Option<&str>) -> Select<Comment> {
        let mut query = Self::by_active_authors();

        if let Some(viewer_id) = viewer_id {
            query = query.filter(
                comment::Column::AuthorId
                    .not_in_subquery(BlockingRepository::blocked_ids_query(viewer_id)),
            );
        }

        query
    }

    /// Find a comment by ID if it is visible to the viewer.
    pub async fn find_visible_by_id(
        &self,
        id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Option<comment::Model>> {
        Self::visible_to(viewer_id)
            .filter(comment::Column::Id.eq(id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Top-level comments on a post visible to the viewer, oldest first.
    pub async fn find_top_level_visible(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        Self::visible_to(viewer_id)
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::ParentId.is_null())
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies to the given comments visible to the viewer, oldest first.
    pub async fn find_replies(
        &self,
        parent_ids: &[String],
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        Self::visible_to(viewer_id)
            .filter(comment::Column::ParentId.is_in(parent_ids.to_vec()))
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of comments on a post from active authors, flags ignored.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Self::by_active_authors()
            .filter(comment::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
