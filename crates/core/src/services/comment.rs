//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{comment, user},
    repositories::{BlockingRepository, CommentRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::user::{UserResponse, blockers_of};
use crate::policy;

/// Input for creating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,

    /// Reply to this comment. Must be on the same post.
    pub parent_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

/// Response for a comment.
///
/// Top-level comments carry their direct replies; replies themselves do not.
#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author: UserResponse,
    pub parent_id: Option<String>,
    pub content: String,
    pub is_hidden: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies_count: Option<usize>,
}

impl CommentResponse {
    fn new(comment: comment::Model, author: UserResponse) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author,
            parent_id: comment.parent_id,
            content: comment.content,
            is_hidden: comment.is_hidden,
            is_deleted: comment.is_deleted,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.map(|t| t.to_rfc3339()),
            replies: None,
            replies_count: None,
        }
    }

    fn with_replies(mut self, replies: Vec<Self>) -> Self {
        self.replies_count = Some(replies.len());
        self.replies = Some(replies);
        self
    }
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Top-level comments on a visible post, each with its direct replies.
    pub async fn list_for_post(
        &self,
        viewer_id: Option<&str>,
        post_id: &str,
    ) -> AppResult<Vec<CommentResponse>> {
        self.ensure_post_visible(viewer_id, post_id).await?;

        let top_level = self
            .comment_repo
            .find_top_level_visible(post_id, viewer_id)
            .await?;
        let parent_ids: Vec<String> = top_level.iter().map(|c| c.id.clone()).collect();
        let replies = self
            .comment_repo
            .find_replies(&parent_ids, viewer_id)
            .await?;

        let mut author_ids: Vec<String> = top_level
            .iter()
            .chain(replies.iter())
            .map(|c| c.author_id.clone())
            .collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors = self.authors(&author_ids).await?;
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;
        let view = |c: comment::Model| {
            authors
                .get(&c.author_id)
                .cloned()
                .map(|a| CommentResponse::new(c, UserResponse::for_viewer(a, &blockers)))
        };

        let mut replies_by_parent: HashMap<String, Vec<CommentResponse>> = HashMap::new();
        for reply in replies {
            let Some(parent_id) = reply.parent_id.clone() else {
                continue;
            };
            if let Some(response) = view(reply) {
                replies_by_parent.entry(parent_id).or_default().push(response);
            }
        }

        Ok(top_level
            .into_iter()
            .filter_map(|c| {
                let replies = replies_by_parent.remove(&c.id).unwrap_or_default();
                view(c).map(|r| r.with_replies(replies))
            })
            .collect())
    }

    /// Comment on a visible post, optionally as a reply.
    pub async fn create(
        &self,
        author: &user::Model,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentResponse> {
        input.validate()?;
        self.ensure_post_visible(Some(&author.id), post_id).await?;

        if let Some(parent_id) = &input.parent_id {
            let parent = self.comment_repo.find_by_id(parent_id).await?;
            if !parent.is_some_and(|p| p.post_id == post_id) {
                return Err(AppError::BadRequest(
                    "Parent comment must belong to the same post".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author.id.clone()),
            parent_id: Set(input.parent_id),
            content: Set(input.content),
            is_hidden: Set(false),
            is_deleted: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        info!(comment_id = %comment.id, post_id = %post_id, author = %author.id, "Created comment");
        Ok(CommentResponse::new(
            comment,
            UserResponse::from_model(author.clone(), false),
        ))
    }

    /// Get a comment whose author is active and not blocked by the viewer.
    pub async fn get(&self, viewer_id: Option<&str>, id: &str) -> AppResult<CommentResponse> {
        let comment = self
            .comment_repo
            .find_visible_by_id(id, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {id}")))?;
        let author = self.user_repo.get_by_id(&comment.author_id).await?;

        let has_blocked_me = match viewer_id {
            Some(viewer) => self.blocking_repo.is_blocking(&author.id, viewer).await?,
            None => false,
        };
        Ok(CommentResponse::new(
            comment,
            UserResponse::from_model(author, has_blocked_me),
        ))
    }

    /// Edit a comment. Only the author or a moderator may do this.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<CommentResponse> {
        input.validate()?;

        let comment = self.get_model(id).await?;
        policy::require_can_modify(actor, &comment.author_id, "comment")?;

        let mut active: comment::ActiveModel = comment.into();
        active.content = Set(input.content);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.comment_repo.update(active).await?;

        self.respond(updated).await
    }

    /// Soft-delete a comment. Only the author or a moderator may do this.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let comment = self.get_model(id).await?;
        policy::require_can_modify(actor, &comment.author_id, "comment")?;

        let mut active: comment::ActiveModel = comment.into();
        active.is_deleted = Set(true);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.comment_repo.update(active).await?;

        info!(comment_id = %updated.id, by = %actor.id, "Deleted comment");
        Ok(())
    }

    /// Hide or unhide a comment. Moderators only.
    pub async fn set_hidden(
        &self,
        actor: &user::Model,
        id: &str,
        hidden: bool,
    ) -> AppResult<CommentResponse> {
        policy::require_moderator(actor)?;

        let comment = self.get_model(id).await?;
        let mut active: comment::ActiveModel = comment.into();
        active.is_hidden = Set(hidden);
        let updated = self.comment_repo.update(active).await?;

        info!(comment_id = %updated.id, hidden, by = %actor.id, "Changed comment visibility");
        self.respond(updated).await
    }

    async fn get_model(&self, id: &str) -> AppResult<comment::Model> {
        self.comment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {id}")))
    }

    async fn ensure_post_visible(&self, viewer_id: Option<&str>, post_id: &str) -> AppResult<()> {
        self.post_repo
            .find_visible_by_id(post_id, viewer_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))
    }

    async fn respond(&self, comment: comment::Model) -> AppResult<CommentResponse> {
        let author = self.user_repo.get_by_id(&comment.author_id).await?;
        Ok(CommentResponse::new(
            comment,
            UserResponse::from_model(author, false),
        ))
    }

    async fn authors(&self, ids: &[String]) -> AppResult<HashMap<String, user::Model>> {
        Ok(self
            .user_repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::test_support;
    use lookbook_db::entities::{blocking, post};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_service(db: DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            BlockingRepository::new(db),
        )
    }

    fn create_test_post(id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: "alice".to_string(),
            page_id: None,
            title: String::new(),
            content: "hello".to_string(),
            image: None,
            video: None,
            visibility: post::PostVisibility::Public,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_comment(id: &str, post_id: &str, author: &str, parent: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: author.to_string(),
            parent_id: parent.map(String::from),
            content: format!("comment {id}"),
            is_hidden: false,
            is_deleted: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_list_groups_replies_under_parents() {
        let mut hidden_reply = create_test_comment("r2", "p1", "alice", Some("c1"));
        hidden_reply.is_hidden = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1")]])
            .append_query_results([[
                create_test_comment("c1", "p1", "alice", None),
                create_test_comment("c2", "p1", "bob", None),
            ]])
            .append_query_results([[
                create_test_comment("r1", "p1", "bob", Some("c1")),
                hidden_reply,
            ]])
            .append_query_results([[test_support::user("alice"), test_support::user("bob")]])
            .append_query_results([Vec::<blocking::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let comments = service.list_for_post(Some("carol"), "p1").await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].replies_count, Some(2));
        assert_eq!(comments[1].replies_count, Some(0));

        // hidden replies stay in the listing and the count
        let replies = comments[0].replies.as_ref().unwrap();
        assert_eq!(replies[0].id, "r1");
        assert!(replies[0].replies.is_none());
        assert!(replies[1].is_hidden);
    }

    #[tokio::test]
    async fn test_get_filtered_comment_is_not_found() {
        // inactive or blocked author: the visibility query yields nothing
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<comment::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let result = service.get(Some("carol"), "c1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_reply_on_other_post_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1")]])
            .append_query_results([[create_test_comment("c9", "p2", "bob", None)]])
            .into_connection();
        let service = create_test_service(db);

        let input = CreateCommentInput {
            content: "me too".to_string(),
            parent_id: Some("c9".to_string()),
        };
        let result = service
            .create(&test_support::user("alice"), "p1", input)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_on_missing_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let input = CreateCommentInput {
            content: "hi".to_string(),
            parent_id: None,
        };
        let result = service
            .create(&test_support::user("alice"), "p404", input)
            .await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let mut deleted = create_test_comment("c1", "p1", "alice", None);
        deleted.is_deleted = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "p1", "alice", None)]])
            .append_query_results([[deleted]])
            .into_connection();
        let service = create_test_service(db);

        service
            .delete(&test_support::user("alice"), "c1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_stranger_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "p1", "alice", None)]])
            .into_connection();
        let service = create_test_service(db);

        let result = service.delete(&test_support::user("bob"), "c1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_set_hidden_requires_staff() {
        let service =
            create_test_service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service
            .set_hidden(&test_support::user("alice"), "c1", true)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_set_hidden_by_staff() {
        let mut hidden = create_test_comment("c1", "p1", "alice", None);
        hidden.is_hidden = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_comment("c1", "p1", "alice", None)]])
            .append_query_results([[hidden]])
            .append_query_results([[test_support::user("alice")]])
            .into_connection();
        let service = create_test_service(db);

        let view = service
            .set_hidden(&test_support::staff("mod"), "c1", true)
            .await
            .unwrap();
        assert!(view.is_hidden);
    }
}
