//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use lookbook_core::{
    BlockingService, CommentService, FriendshipService, GroupService, ModerationService,
    PageService, PostService, SetupService, TokenService, UserService,
};
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub token_service: TokenService,
    pub blocking_service: BlockingService,
    pub friendship_service: FriendshipService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub page_service: PageService,
    pub group_service: GroupService,
    pub moderation_service: ModerationService,
    pub setup_service: SetupService,
}

/// Authentication middleware.
///
/// A valid bearer token attaches the account to the request. Missing or
/// invalid tokens leave the request anonymous; extractors decide whether
/// that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.token_service.authenticate(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "Ignoring bearer token"),
        }
    }

    next.run(req).await
}
