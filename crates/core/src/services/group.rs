//! Group service.

use std::collections::HashMap;

use chrono::Utc;
use lookbook_common::{AppError, AppResult, IdGenerator};
use lookbook_db::{
    entities::{
        group::{self, GroupCategory, GroupPrivacy},
        group_member::{self, GroupRole},
        user,
    },
    repositories::{BlockingRepository, GroupRepository, UserRepository},
};
use sea_orm::{Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{
    toggle::Toggle,
    user::{UserResponse, blockers_of},
};
use crate::policy;

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default)]
    pub category: GroupCategory,

    #[validate(url)]
    pub profile_picture: Option<String>,

    #[validate(url)]
    pub cover_photo: Option<String>,

    #[serde(default)]
    pub privacy: GroupPrivacy,
}

/// Partial group update.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGroupInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub category: Option<GroupCategory>,

    #[validate(url)]
    pub profile_picture: Option<String>,

    #[validate(url)]
    pub cover_photo: Option<String>,

    pub privacy: Option<GroupPrivacy>,
}

/// Response for a group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: GroupCategory,
    pub profile_picture: Option<String>,
    pub cover_photo: Option<String>,
    pub privacy: GroupPrivacy,
    pub created_by: UserResponse,
    pub members_count: u64,
    pub is_member: bool,
    /// The viewer is an admin member or the creator.
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Response for a group membership.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMemberResponse {
    pub id: String,
    pub user: UserResponse,
    pub role: GroupRole,
    pub joined_at: String,
}

/// Result of a join request.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Joined(group_member::Model),
    AlreadyMember(group_member::Model),
}

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    user_repo: UserRepository,
    blocking_repo: BlockingRepository,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(
        group_repo: GroupRepository,
        user_repo: UserRepository,
        blocking_repo: BlockingRepository,
    ) -> Self {
        Self {
            group_repo,
            user_repo,
            blocking_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// All groups the viewer can see, newest first.
    pub async fn list(&self, viewer_id: Option<&str>) -> AppResult<Vec<GroupResponse>> {
        let groups = self.group_repo.find_visible(viewer_id).await?;
        self.to_responses(viewer_id, groups).await
    }

    /// Get a group.
    pub async fn get(&self, viewer_id: Option<&str>, id: &str) -> AppResult<GroupResponse> {
        let group = self
            .group_repo
            .find_visible_by_id(id, viewer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))?;
        self.to_response(viewer_id, group).await
    }

    /// Create a group. The creator joins it as an admin in the same transaction.
    pub async fn create(
        &self,
        creator: &user::Model,
        input: CreateGroupInput,
    ) -> AppResult<GroupResponse> {
        input.validate()?;

        let now = Utc::now();
        let group_id = self.id_gen.generate();

        let txn = self
            .group_repo
            .db()
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let group = GroupRepository::create_with(
            &txn,
            group::ActiveModel {
                id: Set(group_id.clone()),
                name: Set(input.name),
                description: Set(input.description),
                category: Set(input.category),
                profile_picture: Set(input.profile_picture),
                cover_photo: Set(input.cover_photo),
                privacy: Set(input.privacy),
                created_by_id: Set(creator.id.clone()),
                created_at: Set(now.into()),
                updated_at: Set(None),
            },
        )
        .await?;

        GroupRepository::add_member_with(
            &txn,
            group_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(group_id),
                user_id: Set(creator.id.clone()),
                role: Set(GroupRole::Admin),
                joined_at: Set(now.into()),
            },
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(group_id = %group.id, creator = %creator.id, "Created group");
        self.to_response(Some(&creator.id), group).await
    }

    /// Update a group. Only the creator or a moderator may do this.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<GroupResponse> {
        input.validate()?;

        let group = self.group_repo.get_by_id(id).await?;
        policy::require_can_modify(actor, &group.created_by_id, "group")?;

        let mut active: group::ActiveModel = group.into();
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
        if let Some(privacy) = input.privacy {
            active.privacy = Set(privacy);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.group_repo.update(active).await?;
        self.to_response(Some(&actor.id), updated).await
    }

    /// Delete a group. Only the creator or a moderator may do this.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(id).await?;
        policy::require_can_modify(actor, &group.created_by_id, "group")?;

        self.group_repo.delete(&group.id).await?;
        info!(group_id = %group.id, by = %actor.id, "Deleted group");
        Ok(())
    }

    /// Join a group. Joining twice is not an error.
    pub async fn join(&self, user_id: &str, group_id: &str) -> AppResult<JoinOutcome> {
        let group = self.group_repo.get_by_id(group_id).await?;

        if let Some(member) = self.group_repo.find_member(&group.id, user_id).await? {
            return Ok(JoinOutcome::AlreadyMember(member));
        }

        let member = self.add_member(&group.id, user_id).await?;
        info!(group_id = %group.id, user_id = %user_id, "Joined group");
        Ok(JoinOutcome::Joined(member))
    }

    /// Leave a group.
    pub async fn leave(&self, user_id: &str, group_id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(group_id).await?;

        let member = self
            .group_repo
            .find_member(&group.id, user_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("Not a member".to_string()))?;

        self.group_repo.remove_member(&member.id).await?;
        info!(group_id = %group.id, user_id = %user_id, "Left group");
        Ok(())
    }

    /// Join if not a member, leave otherwise. Returns the new member count.
    pub async fn toggle_membership(
        &self,
        user_id: &str,
        group_id: &str,
    ) -> AppResult<(Toggle, u64)> {
        let group = self.group_repo.get_by_id(group_id).await?;

        let toggle = match self.group_repo.find_member(&group.id, user_id).await? {
            Some(member) => {
                self.group_repo.remove_member(&member.id).await?;
                Toggle::Removed
            }
            None => {
                self.add_member(&group.id, user_id).await?;
                Toggle::Added
            }
        };

        let members_count = self.group_repo.count_members(&group.id).await?;
        Ok((toggle, members_count))
    }

    /// Members of a group, in join order.
    pub async fn list_members(
        &self,
        viewer_id: Option<&str>,
        group_id: &str,
    ) -> AppResult<Vec<GroupMemberResponse>> {
        let group = self.group_repo.get_by_id(group_id).await?;
        let members = self.group_repo.find_members(&group.id).await?;

        let ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
        let users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        Ok(members
            .into_iter()
            .filter_map(|m| {
                let user = users.get(&m.user_id)?.clone();
                Some(GroupMemberResponse {
                    id: m.id,
                    user: UserResponse::for_viewer(user, &blockers),
                    role: m.role,
                    joined_at: m.joined_at.to_rfc3339(),
                })
            })
            .collect())
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> AppResult<group_member::Model> {
        self.group_repo
            .add_member(group_member::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(group_id.to_string()),
                user_id: Set(user_id.to_string()),
                role: Set(GroupRole::Member),
                joined_at: Set(Utc::now().into()),
            })
            .await
    }

    async fn to_response(
        &self,
        viewer_id: Option<&str>,
        group: group::Model,
    ) -> AppResult<GroupResponse> {
        let id = group.id.clone();
        self.to_responses(viewer_id, vec![group])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    async fn to_responses(
        &self,
        viewer_id: Option<&str>,
        groups: Vec<group::Model>,
    ) -> AppResult<Vec<GroupResponse>> {
        if groups.is_empty() {
            return Ok(vec![]);
        }

        let mut creator_ids: Vec<String> = groups.iter().map(|g| g.created_by_id.clone()).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&creator_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();
        let blockers = blockers_of(&self.blocking_repo, viewer_id).await?;

        let mut responses = Vec::with_capacity(groups.len());
        for group in groups {
            let Some(creator) = creators.get(&group.created_by_id) else {
                continue;
            };

            let members_count = self.group_repo.count_members(&group.id).await?;
            let (is_member, is_admin) = match viewer_id {
                Some(viewer) => {
                    let membership = self.group_repo.find_member(&group.id, viewer).await?;
                    let is_admin = group.created_by_id == viewer
                        || membership.as_ref().is_some_and(|m| m.role == GroupRole::Admin);
                    (membership.is_some(), is_admin)
                }
                None => (false, false),
            };

            responses.push(GroupResponse {
                id: group.id,
                name: group.name,
                description: group.description,
                category: group.category,
                profile_picture: group.profile_picture,
                cover_photo: group.cover_photo,
                privacy: group.privacy,
                created_by: UserResponse::for_viewer(creator.clone(), &blockers),
                members_count,
                is_member,
                is_admin,
                created_at: group.created_at.to_rfc3339(),
                updated_at: group.updated_at.map(|t| t.to_rfc3339()),
            });
        }

        Ok(responses)
    }
}
