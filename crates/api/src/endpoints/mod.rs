//! API endpoints.

mod admin;
mod auth;
mod comments;
mod friends;
mod groups;
mod pages;
mod posts;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/users", users::router())
        .nest("/friends", friends::router())
        .nest("/posts", posts::router())
        .nest("/comments", comments::router())
        .nest("/pages", pages::router())
        .nest("/groups", groups::router())
        .nest("/admin", admin::router())
}
