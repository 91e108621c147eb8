//! Post service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{
        page,
        post::{self, PostVisibility},
        post_like, user,
    },
    repositories::{
        BlockingRepository, CommentRepository, PageRepository, PostLikeRepository, PostRepository,
        UserRepository,
    },
};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{
    toggle::Toggle,
    user::{UserResponse, blockers_of},
};
use crate::policy;

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    /// Publish on behalf of a page the caller manages.
    pub page_id: Option<String>,

    #[validate(url)]
    pub image: Option<String>,

    #[validate(url)]
    pub video: Option<String>,

    #[serde(default)]
    pub visibility: PostVisibility,
}

/// Partial post update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 10000))]
    pub content: Option<String>,

    #[validate(url)]
    pub image: Option<String>,

    #[validate(url)]
    pub video: Option<String>,

    pub visibility: Option<PostVisibility>,

    #[serde(default)]
    pub remove_image: bool,

    #[serde(default)]
    pub remove_video: bool,
}

/// Response for a post.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: UserResponse,
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub page_username: Option<String>,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub visibility: PostVisibility,
    pub likes_count: u64,
    pub comments_count: u64,
    pub is_liked: bool,
    /// The viewer follows the page this post was published on.
    pub is_following: bool,
    /// The viewer owns or administers the page this post was published on.
    pub is_page_owner: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    like_repo: PostLikeRepository,
    comment_repo: CommentRepository,
    page_repo: PageRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        like_repo: PostLikeRepository,
        comment_repo: CommentRepository,
        page_repo: PageRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            post_repo,
            like_repo,
            comment_repo,
            page_repo,
            user_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Posts visible to the viewer, newest first.
    pub async fn list(&self, viewer_id: Option<&str>) -> AppResult<Vec<PostResponse>> {
        let posts = self.post_repo.find_visible(viewer_id).await?;
        self.to_responses(viewer_id, posts).await
    }

    /// Get a single visible post.
    pub async fn get(&self, viewer_id: Option<&str>, id: &str) -> AppResult<PostResponse> {
        let post = self
            .post_repo
            .find_visible_by_id(id, viewer_id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))?;
        self.to_response(viewer_id, post).await
    }

    /// Create a post authored by `author`.
    pub async fn create(
        &self,
        author: &user::Model,
        input: CreatePostInput,
    ) -> AppResult<PostResponse> {
        input.validate()?;

        if let Some(page_id) = &input.page_id {
            let page = self
                .page_repo
                .find_by_id(page_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Page not found: {page_id}")))?;

            let is_admin = page.owner_id != author.id
                && self.page_repo.is_admin(&page.id, &author.id).await?;
            if !policy::can_manage_page(&author.id, &page, is_admin) {
                return Err(AppError::Forbidden(
                    "You can only post on pages you manage".to_string(),
                ));
            }
        }

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author.id.clone()),
            page_id: Set(input.page_id),
            title: Set(input.title),
            content: Set(input.content),
            image: Set(input.image),
            video: Set(input.video),
            visibility: Set(input.visibility),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let post = self.post_repo.create(model).await?;
        info!(post_id = %post.id, author = %author.id, "Created post");
        self.to_response(Some(&author.id), post).await
    }

    /// Update a post. Only the author or a moderator may do this.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdatePostInput,
    ) -> AppResult<PostResponse> {
        input.validate()?;

        let post = self.post_repo.get_by_id(id).await?;
        policy::require_can_modify(actor, &post.author_id, "post")?;

        let mut active: post::ActiveModel = post.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(visibility) = input.visibility {
            active.visibility = Set(visibility);
        }
        active.image = match (input.remove_image, input.image) {
            (true, _) => Set(None),
            (false, Some(url)) => Set(Some(url)),
            (false, None) => NotSet,
        };
        active.video = match (input.remove_video, input.video) {
            (true, _) => Set(None),
            (false, Some(url)) => Set(Some(url)),
            (false, None) => NotSet,
        };
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.post_repo.update(active).await?;
        self.to_response(Some(&actor.id), updated).await
    }

    /// Delete a post. Only the author or a moderator may do this.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        policy::require_can_modify(actor, &post.author_id, "post")?;

        self.post_repo.delete(&post.id).await?;
        info!(post_id = %post.id, by = %actor.id, "Deleted post");
        Ok(())
    }

    /// Like the post, or remove the like if present. Returns the new like count.
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> AppResult<(Toggle, u64)> {
        let post = self
            .post_repo
            .find_visible_by_id(post_id, Some(user_id))
            .await?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        let toggle = match self.like_repo.find_by_pair(user_id, &post.id).await? {
            Some(like) => {
                self.like_repo.delete(&like.id).await?;
                Toggle::Removed
            }
            None => {
                let model = post_like::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    user_id: Set(user_id.to_string()),
                    post_id: Set(post.id.clone()),
                    created_at: Set(Utc::now().into()),
                };
                self.like_repo.create(model).await?;
                Toggle::Added
            }
        };

        let likes_count = self.like_repo.count_for_post(&post.id).await?;
        Ok((toggle, likes_count))
    }

    async fn to_response(
        &self,
        viewer_id: Option<&str>,
        post: post::Model,
    ) -> AppResult<PostResponse> {
        let id = post.id.clone();
        self.to_responses(viewer_id, vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::PostNotFound(id))
    }

    async fn to_responses(
        &self,
        viewer_id: Option<&str>,
        posts: Vec<post::Model>,
    ) -> AppResult<Vec<PostResponse>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let author_ids: Vec<String> = unique(posts.iter().map(|p| p.author_id.clone()));
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let page_ids: Vec<String> = unique(posts.iter().filter_map(|p| p.page_id.clone()));
        let pages: HashMap<String, page::Model> = self
            .page_repo
            .find_by_ids(&page_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        let mut responses = Vec::with_capacity(posts.len());
        for post in posts {
            let Some(author) = authors.get(&post.author_id) else {
                continue;
            };
            let page = post.page_id.as_ref().and_then(|id| pages.get(id));

            let likes_count = self.like_repo.count_for_post(&post.id).await?;
            let comments_count = self.comment_repo.count_for_post(&post.id).await?;

            let (is_liked, is_following, is_page_owner) = match viewer_id {
                Some(viewer) => {
                    let is_liked = self.like_repo.is_liked(viewer, &post.id).await?;
                    let (is_following, is_page_owner) = match page {
                        Some(page) => {
                            let is_following = self.page_repo.is_following(&page.id, viewer).await?;
                            let is_admin = page.owner_id != viewer
                                && self.page_repo.is_admin(&page.id, viewer).await?;
                            (is_following, policy::can_manage_page(viewer, page, is_admin))
                        }
                        None => (false, false),
                    };
                    (is_liked, is_following, is_page_owner)
                }
                None => (false, false, false),
            };

            responses.push(PostResponse {
                id: post.id,
                author: UserResponse::for_viewer(author.clone(), &blockers),
                page_id: page.map(|p| p.id.clone()),
                page_name: page.map(|p| p.name.clone()),
                page_username: page.map(|p| p.username.clone()),
                title: post.title,
                content: post.content,
                image: post.image,
                video: post.video,
                visibility: post.visibility,
                likes_count,
                comments_count,
                is_liked,
                is_following,
                is_page_owner,
                created_at: post.created_at.to_rfc3339(),
                updated_at: post.updated_at.map(|t| t.to_rfc3339()),
            });
        }

        Ok(responses)
    }
}

/// Deduplicate while keeping first-seen order.
fn unique(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::test_support;
    use lookbook_db::entities::{blocking, page::PageCategory, page_admin};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn create_test_service(db: DatabaseConnection) -> PostService {
        let db = Arc::new(db);
        PostService::new(
            PostRepository::new(Arc::clone(&db)),
            PostLikeRepository::new(Arc::clone(&db)),
            CommentRepository::new(Arc::clone(&db)),
            PageRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            BlockingRepository::new(db),
        )
    }

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            page_id: None,
            title: String::new(),
            content: "hello".to_string(),
            image: Some("https://cdn.example.com/p.png".to_string()),
            video: None,
            visibility: PostVisibility::Public,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_page(id: &str, owner_id: &str) -> page::Model {
        page::Model {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            name: "Cafe".to_string(),
            username: "cafe".to_string(),
            description: None,
            category: PageCategory::Business,
            profile_picture: None,
            cover_photo: None,
            website: None,
            email: None,
            phone: None,
            location: None,
            is_verified: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn count(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn no_blocks() -> Vec<blocking::Model> {
        Vec::new()
    }

    fn no_likes() -> Vec<post_like::Model> {
        Vec::new()
    }

    #[tokio::test]
    async fn test_get_not_visible() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let result = service.get(Some("alice"), "p1").await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_anonymous() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "alice")]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([[count(3)]])
            .append_query_results([[count(2)]])
            .into_connection();
        let service = create_test_service(db);

        let view = service.get(None, "p1").await.unwrap();
        assert_eq!(view.author.id, "alice");
        assert_eq!(view.likes_count, 3);
        assert_eq!(view.comments_count, 2);
        assert!(!view.is_liked);
        assert!(view.page_id.is_none());
    }

    #[tokio::test]
    async fn test_create_on_unmanaged_page_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_page("pg1", "bob")]])
            .append_query_results([Vec::<page_admin::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let input = CreatePostInput {
            title: String::new(),
            content: "hi".to_string(),
            page_id: Some("pg1".to_string()),
            image: None,
            video: None,
            visibility: PostVisibility::Public,
        };
        let result = service.create(&test_support::user("alice"), input).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_on_own_page() {
        let mut post = create_test_post("p1", "alice");
        post.page_id = Some("pg1".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_page("pg1", "alice")]])
            .append_query_results([[post]])
            .append_query_results([[test_support::user("alice")]])
            .append_query_results([[create_test_page("pg1", "alice")]])
            .append_query_results([no_blocks()])
            .append_query_results([[count(0)]])
            .append_query_results([[count(0)]])
            .append_query_results([no_likes()])
            .append_query_results([Vec::<lookbook_db::entities::page_follower::Model>::new()])
            .into_connection();
        let service = create_test_service(db);

        let input = CreatePostInput {
            title: String::new(),
            content: "Open today".to_string(),
            page_id: Some("pg1".to_string()),
            image: None,
            video: None,
            visibility: PostVisibility::Public,
        };
        let view = service.create(&test_support::user("alice"), input).await.unwrap();
        assert_eq!(view.page_username.as_deref(), Some("cafe"));
        assert!(view.is_page_owner);
        assert!(!view.is_following);
    }

    #[tokio::test]
    async fn test_update_by_stranger_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "alice")]])
            .into_connection();
        let service = create_test_service(db);

        let result = service
            .update(&test_support::user("bob"), "p1", UpdatePostInput::default())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_staff_can_delete() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "alice")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = create_test_service(db);

        service
            .delete(&test_support::staff("mod"), "p1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_toggle_like_adds_then_removes() {
        let like = post_like::Model {
            id: "l1".to_string(),
            user_id: "bob".to_string(),
            post_id: "p1".to_string(),
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1", "alice")]])
            .append_query_results([no_likes()])
            .append_query_results([[like.clone()]])
            .append_query_results([[count(1)]])
            .append_query_results([[create_test_post("p1", "alice")]])
            .append_query_results([[like]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([[count(0)]])
            .into_connection();
        let service = create_test_service(db);

        assert_eq!(
            service.toggle_like("bob", "p1").await.unwrap(),
            (Toggle::Added, 1)
        );
        assert_eq!(
            service.toggle_like("bob", "p1").await.unwrap(),
            (Toggle::Removed, 0)
        );
    }

    #[test]
    fn test_unique_keeps_order() {
        let ids = ["b", "a", "b", "c", "a"].into_iter().map(String::from);
        assert_eq!(unique(ids), ["b", "a", "c"]);
    }
}
