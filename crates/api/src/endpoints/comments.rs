//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use lookbook_common::AppResult;
use lookbook_core::{CommentResponse, CreateCommentInput, UpdateCommentInput};

use crate::{
    extractors::{ActiveUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Top-level comments of a post with their replies nested.
async fn list_for_post(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list_for_post(viewer.id(), &post_id)
        .await?;
    Ok(ApiResponse::ok(comments))
}

async fn create(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.create(&user, &post_id, input).await?;
    Ok(ApiResponse::created(comment))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.get(viewer.id(), &id).await?;
    Ok(ApiResponse::ok(comment))
}

async fn update(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(comment))
}

/// Soft delete. The comment stays in listings flagged as deleted.
async fn delete(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.comment_service.delete(&user, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Comment deleted")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{post_id}", get(list_for_post).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
}
