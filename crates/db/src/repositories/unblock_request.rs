//! Unblock request repository.

use std::sync::Arc;

use crate::entities::{
    UnblockRequest,
    unblock_request::{self, UnblockRequestStatus},
};
use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Unblock request repository for database operations.
#[derive(Clone)]
pub struct UnblockRequestRepository {
    db: Arc<DatabaseConnection>,
}

impl UnblockRequestRepository {
    /// Create a new unblock request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a request by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<unblock_request::Model>> {
        UnblockRequest::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the user's pending request, if any.
    pub async fn find_pending_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Option<unblock_request::Model>> {
        UnblockRequest::find()
            .filter(unblock_request::Column::UserId.eq(user_id))
            .filter(unblock_request::Column::Status.eq(UnblockRequestStatus::Pending))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All pending requests, oldest first.
    pub async fn find_pending(&self) -> AppResult<Vec<unblock_request::Model>> {
        UnblockRequest::find()
            .filter(unblock_request::Column::Status.eq(UnblockRequestStatus::Pending))
            .order_by_asc(unblock_request::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new request.
    pub async fn create(
        &self,
        model: unblock_request::ActiveModel,
    ) -> AppResult<unblock_request::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a request.
    pub async fn update(
        &self,
        model: unblock_request::ActiveModel,
    ) -> AppResult<unblock_request::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
