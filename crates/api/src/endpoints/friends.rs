//! Friendship endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{
    FriendCategories, FriendshipResponse, ResolveAction, ResolveOutcome, SendOutcome,
};
use serde::Serialize;

use crate::{
    extractors::{ActiveUser, AuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Outcome of reject/cancel.
#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendship: Option<FriendshipResponse>,
}

/// Accepted relationships of the caller.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<FriendshipResponse>>> {
    let friendships = state.friendship_service.list_friendships(&user.id).await?;
    Ok(ApiResponse::ok(friendships))
}

/// Friends, pending requests and suggestions in one payload.
async fn categories(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<FriendCategories>> {
    let categories = state.friendship_service.categorize(&user.id).await?;
    Ok(ApiResponse::ok(categories))
}

/// Send a friend request. Reopening a rejected request answers 200.
async fn send_request(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<ApiResponse<FriendshipResponse>> {
    let outcome = state
        .friendship_service
        .send_request(&user.id, &user_id)
        .await?;
    let created = matches!(outcome, SendOutcome::Created(_));
    Ok(ApiResponse::created_if(created, outcome.into_response()))
}

async fn accept(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<FriendshipResponse>> {
    let friendship = state.friendship_service.accept(&user.id, &id).await?;
    Ok(ApiResponse::ok(friendship))
}

async fn resolve(
    state: &AppState,
    user_id: &str,
    id: &str,
    action: ResolveAction,
) -> AppResult<ApiResponse<ResolveResponse>> {
    let response = match state.friendship_service.resolve(user_id, id, action).await? {
        ResolveOutcome::Cancelled => ResolveResponse {
            message: "Friend request cancelled",
            friendship: None,
        },
        ResolveOutcome::Rejected(friendship) => ResolveResponse {
            message: "Friend request rejected",
            friendship: Some(friendship),
        },
    };
    Ok(ApiResponse::ok(response))
}

/// Reject a request. The initiator calling this withdraws it instead.
async fn reject(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ResolveResponse>> {
    resolve(&state, &user.id, &id, ResolveAction::Reject).await
}

async fn cancel(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ResolveResponse>> {
    resolve(&state, &user.id, &id, ResolveAction::Cancel).await
}

async fn unfriend(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.friendship_service.unfriend(&user.id, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Friend removed")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/categories", get(categories))
        .route("/request/{user_id}", post(send_request))
        .route("/accept/{id}", post(accept))
        .route("/reject/{id}", post(reject))
        .route("/cancel/{id}", post(cancel))
        .route("/unfriend/{id}", post(unfriend))
}
