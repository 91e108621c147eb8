//! Staff moderation endpoints.
//!
//! Authorization is enforced by the services; these handlers only require
//! an authenticated, active caller.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{CommentResponse, ReviewInput, UnblockRequestResponse, UserResponse};

use crate::{extractors::ActiveUser, middleware::AppState, response::ApiResponse};

async fn deactivate(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.moderation_service.deactivate(&moderator, &id).await?;
    Ok(ApiResponse::ok(user))
}

async fn activate(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.moderation_service.activate(&moderator, &id).await?;
    Ok(ApiResponse::ok(user))
}

async fn grant_rich_editor(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .moderation_service
        .grant_rich_editor(&moderator, &id)
        .await?;
    Ok(ApiResponse::ok(user))
}

async fn revoke_rich_editor(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .moderation_service
        .revoke_rich_editor(&moderator, &id)
        .await?;
    Ok(ApiResponse::ok(user))
}

/// Review notes are optional; an empty body is accepted.
fn review_input(body: Option<Json<ReviewInput>>) -> ReviewInput {
    body.map(|Json(input)| input).unwrap_or_default()
}

/// Pending unblock requests, oldest first.
async fn unblock_requests(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UnblockRequestResponse>>> {
    let requests = state
        .moderation_service
        .list_unblock_requests(&moderator)
        .await?;
    Ok(ApiResponse::ok(requests))
}

async fn approve_unblock_request(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Option<Json<ReviewInput>>,
) -> AppResult<ApiResponse<UnblockRequestResponse>> {
    let request = state
        .moderation_service
        .approve_unblock_request(&moderator, &id, review_input(input))
        .await?;
    Ok(ApiResponse::ok(request))
}

async fn reject_unblock_request(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Option<Json<ReviewInput>>,
) -> AppResult<ApiResponse<UnblockRequestResponse>> {
    let request = state
        .moderation_service
        .reject_unblock_request(&moderator, &id, review_input(input))
        .await?;
    Ok(ApiResponse::ok(request))
}

async fn hide_comment(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.set_hidden(&moderator, &id, true).await?;
    Ok(ApiResponse::ok(comment))
}

async fn unhide_comment(
    ActiveUser(moderator): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.set_hidden(&moderator, &id, false).await?;
    Ok(ApiResponse::ok(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/deactivate", post(deactivate))
        .route("/users/{id}/activate", post(activate))
        .route("/users/{id}/rich-editor/grant", post(grant_rich_editor))
        .route("/users/{id}/rich-editor/revoke", post(revoke_rich_editor))
        .route("/unblock-requests", get(unblock_requests))
        .route("/unblock-requests/{id}/approve", post(approve_unblock_request))
        .route("/unblock-requests/{id}/reject", post(reject_unblock_request))
        .route("/comments/{id}/hide", post(hide_comment))
        .route("/comments/{id}/unhide", post(unhide_comment))
}
