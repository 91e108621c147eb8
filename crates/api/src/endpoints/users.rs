//! Account endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use lookbook_common::AppResult;
use lookbook_core::{
    BlockOutcome, EnsureSuperuserInput, PromoteInput, RegisterInput, UpdateProfileInput,
    UserResponse,
};
use lookbook_db::entities::{blocking, unblock_request};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{ActiveUser, AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Header carrying the setup secret.
const SETUP_TOKEN_HEADER: &str = "x-setup-token";

/// Appeal against deactivation.
#[derive(Debug, Deserialize)]
pub struct UnblockAppealRequest {
    #[serde(default)]
    pub message: String,
}

/// Block response.
#[derive(Serialize)]
pub struct BlockResponse {
    pub message: &'static str,
    pub block: blocking::Model,
}

/// Register a new account.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.register(input).await?;
    Ok(ApiResponse::created(UserResponse::from_model(user, false)))
}

/// Get own profile.
async fn profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResponse<UserResponse> {
    ApiResponse::ok(state.user_service.get_profile(user))
}

/// Update own profile.
async fn update_profile(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_profile(&user.id, input).await?;
    Ok(ApiResponse::ok(updated))
}

/// Show a user.
async fn show(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get_user(viewer.id(), &id).await?;
    Ok(ApiResponse::ok(user))
}

async fn request_rich_editor(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let outcome = state.user_service.request_rich_editor_access(user).await?;
    Ok(ApiResponse::ok(MessageResponse::new(outcome.message())))
}

async fn cancel_rich_editor(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.user_service.cancel_rich_editor_request(user).await?;
    Ok(ApiResponse::ok(MessageResponse::new(
        "Rich editor request cancelled",
    )))
}

/// Block a user. Any friendship between the two is removed.
async fn block(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BlockResponse>> {
    let outcome = state.blocking_service.block(&user.id, &id).await?;
    let created = outcome.is_created();
    let (message, block) = match outcome {
        BlockOutcome::Created(block) => ("User blocked", block),
        BlockOutcome::AlreadyBlocked(block) => ("User already blocked", block),
    };
    Ok(ApiResponse::created_if(created, BlockResponse { message, block }))
}

async fn unblock(
    ActiveUser(user): ActiveUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    state.blocking_service.unblock(&user.id, &id).await?;
    Ok(ApiResponse::ok(MessageResponse::new("User unblocked")))
}

/// List accounts the caller has blocked.
async fn blocked(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state.blocking_service.list_blocked(&user.id).await?;
    Ok(ApiResponse::ok(users))
}

/// File an unblock request. Only deactivated accounts may do this.
async fn request_unblock(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UnblockAppealRequest>,
) -> AppResult<ApiResponse<unblock_request::Model>> {
    let request = state
        .user_service
        .request_unblock(&user, &req.message)
        .await?;
    Ok(ApiResponse::created(request))
}

fn setup_token<'a>(headers: &'a HeaderMap, body_token: Option<&'a str>) -> Option<&'a str> {
    headers
        .get(SETUP_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(body_token)
}

/// Create or reclaim the first superuser.
async fn ensure_superuser(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<EnsureSuperuserInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    state
        .setup_service
        .authorize(setup_token(&headers, input.token.as_deref()))?;
    let user = state.setup_service.ensure_superuser(input).await?;
    Ok(ApiResponse::created(user))
}

/// Promote an existing account to staff.
async fn promote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PromoteInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    state
        .setup_service
        .authorize(setup_token(&headers, input.token.as_deref()))?;
    let user = state.setup_service.promote(input).await?;
    Ok(ApiResponse::ok(user))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/profile", get(profile).patch(update_profile))
        .route("/blocked", get(blocked))
        .route("/request-unblock", post(request_unblock))
        .route("/rich-editor/request", post(request_rich_editor))
        .route("/rich-editor/cancel", post(cancel_rich_editor))
        .route("/setup/ensure-superuser", post(ensure_superuser))
        .route("/setup/promote", post(promote))
        .route("/{id}", get(show))
        .route("/{id}/block", post(block))
        .route("/{id}/unblock", post(unblock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_setup_token_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(SETUP_TOKEN_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(setup_token(&headers, Some("from-body")), Some("from-header"));
    }

    #[test]
    fn test_setup_token_falls_back_to_body() {
        let headers = HeaderMap::new();
        assert_eq!(setup_token(&headers, Some("from-body")), Some("from-body"));
        assert_eq!(setup_token(&headers, None), None);
    }
}
