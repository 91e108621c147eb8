//! Refresh token repository.

use std::sync::Arc;

use crate::entities::{RefreshToken, refresh_token};
use lookbook_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait};

/// Refresh token repository for database operations.
#[derive(Clone)]
pub struct RefreshTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the underlying connection, for opening transactions.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find a token record by its `jti`.
    pub async fn find_by_id_with<C: ConnectionTrait>(
        conn: &C,
        jti: &str,
    ) -> AppResult<Option<refresh_token::Model>> {
        RefreshToken::find_by_id(jti)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record an issued token.
    pub async fn create(
        &self,
        model: refresh_token::ActiveModel,
    ) -> AppResult<refresh_token::Model> {
        Self::create_with(self.db.as_ref(), model).await
    }

    /// Record an issued token on the given connection or transaction.
    pub async fn create_with<C: ConnectionTrait>(
        conn: &C,
        model: refresh_token::ActiveModel,
    ) -> AppResult<refresh_token::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a token record on the given connection or transaction.
    pub async fn update_with<C: ConnectionTrait>(
        conn: &C,
        model: refresh_token::ActiveModel,
    ) -> AppResult<refresh_token::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
