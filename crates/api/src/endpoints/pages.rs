//! Page endpoints.
//!
//! Every route shares the `{page}` segment. Detail, update and delete
//! address a page by username; the remaining routes use its id.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{AddPageAdminInput, CreatePageInput, PageResponse, UpdatePageInput, UserResponse};
use lookbook_db::entities::page_admin;

use crate::{
    extractors::{ActiveUser, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse, ToggleResponse},
};

async fn list(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PageResponse>>> {
    let pages = state.page_service.list(viewer.id()).await?;
    Ok(ApiResponse::ok(pages))
}

/// Pages owned by the caller.
async fn my_pages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PageResponse>>> {
    let pages = state.page_service.list_mine(&user.id).await?;
    Ok(ApiResponse::ok(pages))
}

async fn create(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePageInput>,
) -> AppResult<ApiResponse<PageResponse>> {
    let page = state.page_service.create(&user, input).await?;
    Ok(ApiResponse::created(page))
}

async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<PageResponse>> {
    let page = state
        .page_service
        .get_by_username(viewer.id(), &username)
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn update(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(input): Json<UpdatePageInput>,
) -> AppResult<ApiResponse<PageResponse>> {
    let page = state.page_service.update(&user, &username, input).await?;
    Ok(ApiResponse::ok(page))
}

async fn delete(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.page_service.delete(&user, &username).await?;
    Ok(ApiResponse::ok(MessageResponse::new("Page deleted")))
}

/// Follow or unfollow a page.
async fn follow(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> AppResult<ApiResponse<ToggleResponse>> {
    let (status, count) = state.page_service.toggle_follow(&user.id, &page_id).await?;
    Ok(ApiResponse::created_if(
        status.is_added(),
        ToggleResponse { status, count },
    ))
}

async fn followers(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .page_service
        .list_followers(viewer.id(), &page_id)
        .await?;
    Ok(ApiResponse::ok(users))
}

/// Grant another account admin rights. Owner only.
async fn add_admin(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(input): Json<AddPageAdminInput>,
) -> AppResult<ApiResponse<page_admin::Model>> {
    let admin = state
        .page_service
        .add_admin(&user.id, &page_id, input)
        .await?;
    Ok(ApiResponse::created(admin))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/my", get(my_pages))
        .route("/{page}", get(show).patch(update).delete(delete))
        .route("/{page}/follow", post(follow))
        .route("/{page}/followers", get(followers))
        .route("/{page}/add-admin", post(add_admin))
}
