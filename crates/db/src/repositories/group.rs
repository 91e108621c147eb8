//! Group repository.

use std::sync::Arc;

use lookbook_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    sea_query::JoinType,
};

use super::BlockingRepository;
use crate::entities::group_member::GroupRole;
use crate::entities::{Group, GroupMember, group, group_member, user};

/// Repository for group operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Group Operations ====================

    /// Groups whose creator is active and, for a signed-in viewer, not
    /// blocked by the viewer.
    pub(crate) fn visible_to(viewer_id: Option<&str>) -> Select<Group> {
        let mut query = Group::find()
            .join(JoinType::InnerJoin, group::Relation::Creator.def())
            .filter(user::Column::IsActive.eq(true));

        if let Some(viewer_id) = viewer_id {
            query = query.filter(
                group::Column::CreatedById
                    .not_in_subquery(BlockingRepository::blocked_ids_query(viewer_id)),
            );
        }

        query
    }

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Find a group by ID if it is visible to the viewer.
    pub async fn find_visible_by_id(
        &self,
        id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<Option<group::Model>> {
        Self::visible_to(viewer_id)
            .filter(group::Column::Id.eq(id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All groups visible to the viewer, newest first.
    pub async fn find_visible(&self, viewer_id: Option<&str>) -> AppResult<Vec<group::Model>> {
        Self::visible_to(viewer_id)
            .order_by(group::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a group on the given connection or transaction.
    pub async fn create_with<C: ConnectionTrait>(
        conn: &C,
        model: group::ActiveModel,
    ) -> AppResult<group::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a group.
    pub async fn update(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a group. Memberships cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Group::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ==================== Member Operations ====================

    /// Find a membership.
    pub async fn find_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether the user is a member of the group.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.find_member(group_id, user_id).await?.is_some())
    }

    /// Whether the user is an admin member of the group.
    pub async fn is_admin(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self
            .find_member(group_id, user_id)
            .await?
            .is_some_and(|m| m.role == GroupRole::Admin))
    }

    /// Members of a group, in join order.
    pub async fn find_members(&self, group_id: &str) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by(group_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count members of a group.
    pub async fn count_members(&self, group_id: &str) -> AppResult<u64> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member.
    pub async fn add_member(
        &self,
        model: group_member::ActiveModel,
    ) -> AppResult<group_member::Model> {
        Self::add_member_with(self.db.as_ref(), model).await
    }

    /// Add a member on the given connection or transaction.
    pub async fn add_member_with<C: ConnectionTrait>(
        conn: &C,
        model: group_member::ActiveModel,
    ) -> AppResult<group_member::Model> {
        model.insert(conn).await.map_err(|e| AppError::from_db(&e))
    }

    /// Remove a membership by ID.
    pub async fn remove_member(&self, id: &str) -> AppResult<()> {
        GroupMember::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    fn create_test_member(role: GroupRole) -> group_member::Model {
        group_member::Model {
            id: "m1".to_string(),
            group_id: "g1".to_string(),
            user_id: "user1".to_string(),
            role,
            joined_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<group::Model>::new()])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_is_admin_checks_role() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_member(GroupRole::Member)]])
                .append_query_results([[create_test_member(GroupRole::Admin)]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert!(!repo.is_admin("g1", "user1").await.unwrap());
        assert!(repo.is_admin("g1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_members() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert_eq!(repo.count_members("g1").await.unwrap(), 7);
    }

    #[test]
    fn test_visible_to_filters_inactive_and_blocked_creators() {
        let sql = GroupRepository::visible_to(Some("bob"))
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"INNER JOIN "user""#));
        assert!(sql.contains(r#""user"."is_active""#));
        assert!(
            sql.contains(r#""group"."created_by_id" NOT IN (SELECT "blocked_id" FROM "blocking""#)
        );
        assert!(sql.contains("'bob'"));
    }

    #[test]
    fn test_visible_to_anonymous_skips_block_filter() {
        let sql = GroupRepository::visible_to(None)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""user"."is_active""#));
        assert!(!sql.contains("blocking"));
    }
}
