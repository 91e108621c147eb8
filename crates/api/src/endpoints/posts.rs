//! Post endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{CreatePostInput, PostResponse, UpdatePostInput};

use crate::{
    extractors::{ActiveUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse, ToggleResponse},
};

/// Posts visible to the viewer, newest first.
async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PostResponse>>> {
    let posts = state.post_service.list(viewer.id()).await?;
    Ok(ApiResponse::ok(posts))
}

async fn create(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.create(&user, input).await?;
    Ok(ApiResponse::created(post))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.get(viewer.id(), &id).await?;
    Ok(ApiResponse::ok(post))
}

async fn update(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<ApiResponse<PostResponse>> {
    let post = state.post_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(post))
}

async fn delete(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.post_service.delete(&user, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Post deleted")))
}

/// Like or unlike a post.
async fn like(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ToggleResponse>> {
    let (status, count) = state.post_service.toggle_like(&user.id, &id).await?;
    Ok(ApiResponse::created_if(
        status.is_added(),
        ToggleResponse { status, count },
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/like", post(like))
}
