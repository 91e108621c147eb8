//! API integration tests.
//!
//! These drive the full router, including the auth middleware, against a
//! mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use lookbook_api::{AppState, auth_middleware, router as api_router};
use lookbook_common::config::AuthConfig;
use lookbook_core::{
    BlockingService, Claims, CommentService, FriendshipService, GroupService, ModerationService,
    PageService, PostService, SetupService, TokenService, UserService,
};
use lookbook_db::entities::{post, user};
use lookbook_db::repositories::{
    BlockingRepository, CommentRepository, FriendshipRepository, GroupRepository,
    PageRepository, PostLikeRepository, PostRepository, RefreshTokenRepository,
    UnblockRequestRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret";

fn auth_config(setup_token: Option<&str>) -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.to_string(),
        access_token_ttl_secs: 3600,
        refresh_token_ttl_secs: 604_800,
        setup_admin_token: setup_token.map(str::to_string),
    }
}

/// Build app state over a mock database. Every repository shares the same
/// connection, so queued results are consumed in call order.
fn create_test_state(db: MockDatabase, auth: &AuthConfig) -> AppState {
    let db = Arc::new(db.into_connection());

    let user_repo = UserRepository::new(Arc::clone(&db));
    let blocking_repo = BlockingRepository::new(Arc::clone(&db));
    let friendship_repo = FriendshipRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let post_like_repo = PostLikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let page_repo = PageRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let unblock_request_repo = UnblockRequestRepository::new(Arc::clone(&db));
    let refresh_token_repo = RefreshTokenRepository::new(Arc::clone(&db));

    AppState {
        user_service: UserService::new(
            user_repo.clone(),
            blocking_repo.clone(),
            unblock_request_repo.clone(),
        ),
        token_service: TokenService::new(user_repo.clone(), refresh_token_repo, auth),
        blocking_service: BlockingService::new(blocking_repo.clone(), user_repo.clone()),
        friendship_service: FriendshipService::new(
            friendship_repo,
            user_repo.clone(),
            blocking_repo.clone(),
        ),
        post_service: PostService::new(
            post_repo.clone(),
            post_like_repo,
            comment_repo.clone(),
            page_repo.clone(),
            user_repo.clone(),
            blocking_repo.clone(),
        ),
        comment_service: CommentService::new(
            comment_repo,
            post_repo,
            user_repo.clone(),
            blocking_repo.clone(),
        ),
        page_service: PageService::new(page_repo, user_repo.clone(), blocking_repo.clone()),
        group_service: GroupService::new(group_repo, user_repo.clone(), blocking_repo),
        moderation_service: ModerationService::new(user_repo.clone(), unblock_request_repo),
        setup_service: SetupService::new(user_repo, auth.setup_admin_token.clone()),
    }
}

fn create_test_router(db: MockDatabase) -> Router {
    let state = create_test_state(db, &auth_config(None));
    Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn test_user(id: &str, is_active: bool) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        bio: None,
        profile_picture: None,
        cover_photo: None,
        date_of_birth: None,
        location: None,
        website: None,
        is_active,
        is_staff: false,
        is_superuser: false,
        can_use_rich_editor: false,
        rich_editor_requested: false,
        rich_editor_request_date: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn token_for(user_id: &str, typ: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        typ: typ.to_string(),
        jti: None,
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn bearer(user_id: &str) -> String {
    format!("Bearer {}", token_for(user_id, "access"))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = auth {
        builder = builder.header(header::AUTHORIZATION, bearer(user_id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_friends_without_token_returns_401_envelope() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/friends")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_garbage_bearer_token_is_treated_as_anonymous() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/profile")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_returns_data_envelope() {
    // authenticate
    let db = empty_db().append_query_results([vec![test_user("alice", true)]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/profile")
                .header(header::AUTHORIZATION, bearer("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_obtain_token_with_unknown_user_returns_401() {
    let db = empty_db().append_query_results([Vec::<user::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/token",
            None,
            &json!({"username": "ghost", "password": "whatever123"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/token/refresh",
            None,
            &json!({"refresh": token_for("alice", "access")}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_post_list_is_empty() {
    let db = empty_db().append_query_results([Vec::<post::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"data": []}));
}

#[tokio::test]
async fn test_deactivated_user_cannot_create_post() {
    let db = empty_db().append_query_results([vec![test_user("alice", false)]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/posts",
            Some("alice"),
            &json!({"content": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_friend_request_to_self_is_rejected() {
    // authenticate, then the recipient lookup inside the transaction
    let db = empty_db().append_query_results([
        vec![test_user("alice", true)],
        vec![test_user("alice", true)],
    ]);
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/friends/request/alice")
                .header(header::AUTHORIZATION, bearer("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_moderation_requires_staff() {
    let db = empty_db().append_query_results([vec![test_user("alice", true)]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/users/bob/deactivate")
                .header(header::AUTHORIZATION, bearer("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_setup_is_disabled_without_token() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/users/setup/ensure-superuser",
            None,
            &json!({
                "username": "root",
                "email": "root@example.com",
                "password": "correct-horse",
                "token": "guess"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Forbidden: Setup is disabled");
}

#[tokio::test]
async fn test_setup_rejects_wrong_header_token() {
    let state = create_test_state(empty_db(), &auth_config(Some("s3cret")));
    let app = Router::new()
        .nest("/api", api_router())
        .with_state(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/users/setup/promote")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Setup-Token", "wrong")
        .body(Body::from(json!({"username": "alice"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
