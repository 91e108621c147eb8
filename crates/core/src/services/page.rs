//! Page service.
//!
//! Pages are public profiles for businesses and communities. The owner can
//! delegate posting rights to page admins; any user can follow a page.

use std::collections::HashMap;

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{
        page::{self, PageCategory},
        page_admin::{self, PageRole},
        page_follower, user,
    },
    repositories::{BlockingRepository, PageRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{
    toggle::Toggle,
    user::{UserResponse, blockers_of},
};
use crate::policy;

/// Input for creating a page.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePageInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default)]
    pub category: PageCategory,

    #[validate(url)]
    pub profile_picture: Option<String>,

    #[validate(url)]
    pub cover_photo: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 200))]
    pub location: Option<String>,
}

/// Partial page update.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePageInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub category: Option<PageCategory>,

    #[validate(url)]
    pub profile_picture: Option<String>,

    #[validate(url)]
    pub cover_photo: Option<String>,

    #[validate(url)]
    pub website: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 200))]
    pub location: Option<String>,
}

/// Input for adding a page admin.
#[derive(Debug, Deserialize)]
pub struct AddPageAdminInput {
    pub user_id: String,
    #[serde(default)]
    pub role: PageRole,
}

/// Response for a page.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub id: String,
    pub owner: UserResponse,
    pub name: String,
    pub username: String,
    pub description: Option<String>,
    pub category: PageCategory,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub is_verified: bool,
    pub followers_count: u64,
    pub is_following: bool,
    pub is_owner: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Service for managing pages.
#[derive(Clone)]
pub struct PageService {
    page_repo: PageRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl PageService {
    /// Create a new page service.
    #[must_use]
    pub const fn new(
        page_repo: PageRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            page_repo,
            user_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// All pages the viewer can see, newest first.
    pub async fn list(&self, viewer_id: Option<&str>) -> AppResult<Vec<PageResponse>> {
        let pages = self.page_repo.find_visible(viewer_id).await?;
        self.to_responses(viewer_id, pages).await
    }

    /// Pages owned by `user_id`.
    pub async fn list_mine(&self, user_id: &str) -> AppResult<Vec<PageResponse>> {
        let pages = self.page_repo.find_by_owner(user_id).await?;
        self.to_responses(Some(user_id), pages).await
    }

    /// Create a page owned by `owner`.
    pub async fn create(
        &self,
        owner: &user::Model,
        input: CreatePageInput,
    ) -> AppResult<PageResponse> {
        input.validate()?;

        if self
            .page_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Page username already taken".to_string(),
            ));
        }

        let model = page::ActiveModel {
            id: Set(self.id_gen.generate()),
            owner_id: Set(owner.id.clone()),
            name: Set(input.name),
            username: Set(input.username),
            description: Set(input.description),
            category: Set(input.category),
            profile_picture: Set(input.profile_picture),
            cover_photo: Set(input.cover_photo),
            website: Set(input.website),
            email: Set(input.email),
            phone: Set(input.phone),
            location: Set(input.location),
            is_verified: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let page = self.page_repo.create(model).await?;
        info!(page_id = %page.id, username = %page.username, owner = %owner.id, "Created page");
        self.to_response(Some(&owner.id), page).await
    }

    /// Get a page by its username.
    pub async fn get_by_username(
        &self,
        viewer_id: Option<&str>,
        username: &str,
    ) -> AppResult<PageResponse> {
        let page = self
            .page_repo
            .find_visible_by_username(username, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page not found: {username}")))?;
        self.to_response(viewer_id, page).await
    }

    /// Update a page. Only the owner or a moderator may do this.
    pub async fn update(
        &self,
        actor: &user::Model,
        username: &str,
        input: UpdatePageInput,
    ) -> AppResult<PageResponse> {
        input.validate()?;

        let page = self.find_by_username(username).await?;
        policy::require_can_modify(actor, &page.owner_id, "page")?;

        let mut active: page::ActiveModel = page.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(url) = input.profile_picture {
            active.profile_picture = Set(Some(url));
        }
        if let Some(url) = input.cover_photo {
            active.cover_photo = Set(Some(url));
        }
        if let Some(website) = input.website {
            active.website = Set(Some(website));
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(location) = input.location {
            active.location = Set(Some(location));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.page_repo.update(active).await?;
        self.to_response(Some(&actor.id), updated).await
    }

    /// Delete a page. Only the owner or a moderator may do this.
    pub async fn delete(&self, actor: &user::Model, username: &str) -> AppResult<()> {
        let page = self.find_by_username(username).await?;
        policy::require_can_modify(actor, &page.owner_id, "page")?;

        self.page_repo.delete(&page.id).await?;
        info!(page_id = %page.id, by = %actor.id, "Deleted page");
        Ok(())
    }

    /// Follow the page, or unfollow if already following. Returns the new follower count.
    pub async fn toggle_follow(&self, user_id: &str, page_id: &str) -> AppResult<(Toggle, u64)> {
        let page = self.get_by_id(page_id).await?;

        let toggle = match self.page_repo.find_follower(&page.id, user_id).await? {
            Some(follow) => {
                self.page_repo.remove_follower(&follow.id).await?;
                Toggle::Removed
            }
            None => {
                let model = page_follower::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    page_id: Set(page.id.clone()),
                    user_id: Set(user_id.to_string()),
                    created_at: Set(Utc::now().into()),
                };
                self.page_repo.add_follower(model).await?;
                Toggle::Added
            }
        };

        let followers_count = self.page_repo.count_followers(&page.id).await?;
        Ok((toggle, followers_count))
    }

    /// Accounts following the page, in follow order.
    pub async fn list_followers(
        &self,
        viewer_id: Option<&str>,
        page_id: &str,
    ) -> AppResult<Vec<UserResponse>> {
        let page = self.get_by_id(page_id).await?;
        let follows = self.page_repo.find_followers(&page.id).await?;
        let ids: Vec<String> = follows.into_iter().map(|f| f.user_id).collect();

        let mut users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        Ok(ids
            .iter()
            .filter_map(|id| users.remove(id))
            .map(|u| UserResponse::for_viewer(u, &blockers))
            .collect())
    }

    /// Grant a user admin rights on a page. Only the page owner may do this.
    pub async fn add_admin(
        &self,
        actor_id: &str,
        page_id: &str,
        input: AddPageAdminInput,
    ) -> AppResult<page_admin::Model> {
        let page = self.get_by_id(page_id).await?;
        if page.owner_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the page owner can add admins".to_string(),
            ));
        }

        self.user_repo.get_by_id(&input.user_id).await?;

        if self.page_repo.is_admin(&page.id, &input.user_id).await? {
            return Err(AppError::BadRequest("User is already an admin".to_string()));
        }

        let model = page_admin::ActiveModel {
            id: Set(self.id_gen.generate()),
            page_id: Set(page.id.clone()),
            user_id: Set(input.user_id),
            role: Set(input.role),
            created_at: Set(Utc::now().into()),
        };

        let admin = self.page_repo.add_admin(model).await?;
        info!(page_id = %page.id, user_id = %admin.user_id, role = ?admin.role, "Added page admin");
        Ok(admin)
    }

    async fn get_by_id(&self, id: &str) -> AppResult<page::Model> {
        self.page_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page not found: {id}")))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<page::Model> {
        self.page_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page not found: {username}")))
    }

    async fn to_response(
        &self,
        viewer_id: Option<&str>,
        page: page::Model,
    ) -> AppResult<PageResponse> {
        let id = page.id.clone();
        self.to_responses(viewer_id, vec![page])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Page not found: {id}")))
    }

    async fn to_responses(
        &self,
        viewer_id: Option<&str>,
        pages: Vec<page::Model>,
    ) -> AppResult<Vec<PageResponse>> {
        if pages.is_empty() {
            return Ok(vec![]);
        }

        let mut owner_ids: Vec<String> = pages.iter().map(|p| p.owner_id.clone()).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        let owners: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        let mut responses = Vec::with_capacity(pages.len());
        for page in pages {
            let Some(owner) = owners.get(&page.owner_id) else {
                continue;
            };

            let followers_count = self.page_repo.count_followers(&page.id).await?;
            let is_following = match viewer_id {
                Some(viewer) => self.page_repo.is_following(&page.id, viewer).await?,
                None => false,
            };
            let is_owner = viewer_id == Some(page.owner_id.as_str());

            responses.push(PageResponse {
                id: page.id,
                owner: UserResponse::for_viewer(owner.clone(), &blockers),
                name: page.name,
                username: page.username,
                description: page.description,
                category: page.category,
                profile_picture: page.profile_picture,
                cover_photo: page.cover_photo,
                website: page.website,
                email: page.email,
                phone: page.phone,
                location: page.location,
                is_verified: page.is_verified,
                followers_count,
                is_following,
                is_owner,
                created_at: page.created_at.to_rfc3339(),
                updated_at: page.updated_at.map(|t| t.to_rfc3339()),
            });
        }

        Ok(responses)
    }
}
