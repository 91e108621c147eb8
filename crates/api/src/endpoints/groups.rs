//! Group endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{
    CreateGroupInput, GroupMemberResponse, GroupResponse, JoinOutcome, UpdateGroupInput,
};
use lookbook_db::entities::group_member;
use serde::Serialize;

use crate::{
    extractors::{ActiveUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse, ToggleResponse},
};

/// Join response.
#[derive(Serialize)]
pub struct JoinResponse {
    pub message: &'static str,
    pub membership: group_member::Model,
}

async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<GroupResponse>>> {
    let groups = state.group_service.list(viewer.id()).await?;
    Ok(ApiResponse::ok(groups))
}

/// Create a group. The creator becomes its first admin member.
async fn create(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.create(&user, input).await?;
    Ok(ApiResponse::created(group))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.get(viewer.id(), &id).await?;
    Ok(ApiResponse::ok(group))
}

async fn update(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateGroupInput>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.group_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(group))
}

async fn delete(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.group_service.delete(&user, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Group deleted")))
}

async fn join(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<JoinResponse>> {
    let response = match state.group_service.join(&user.id, &id).await? {
        JoinOutcome::Joined(membership) => ApiResponse::created(JoinResponse {
            message: "Joined group",
            membership,
        }),
        JoinOutcome::AlreadyMember(membership) => ApiResponse::ok(JoinResponse {
            message: "Already a member",
            membership,
        }),
    };
    Ok(response)
}

async fn leave(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.group_service.leave(&user.id, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Left group")))
}

async fn toggle_membership(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ToggleResponse>> {
    let (status, count) = state.group_service.toggle_membership(&user.id, &id).await?;
    Ok(ApiResponse::created_if(
        status.is_added(),
        ToggleResponse { status, count },
    ))
}

async fn members(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<GroupMemberResponse>>> {
    let members = state.group_service.list_members(viewer.id(), &id).await?;
    Ok(ApiResponse::ok(members))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", post(leave))
        .route("/{id}/toggle-membership", post(toggle_membership))
        .route("/{id}/members", get(members))
}
