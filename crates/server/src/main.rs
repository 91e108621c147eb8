//! Lookbook server entry point.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, ServiceExt, extract::Request, http::HeaderValue, middleware};
use lookbook_api::{AppState, auth_middleware, router as api_router};
use lookbook_common::{Config, config::CorsConfig};
use lookbook_core::{
    BlockingService, CommentService, FriendshipService, GroupService, ModerationService,
    PageService, PostService, SetupService, TokenService, UserService,
};
use lookbook_db::repositories::{
    BlockingRepository, CommentRepository, FriendshipRepository, GroupRepository,
    PageRepository, PostLikeRepository, PostRepository, RefreshTokenRepository,
    UnblockRequestRepository, UserRepository,
};
use tokio::signal;
use tower::Layer;
use tower_http::{
    cors::{Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Build the CORS layer. An empty origin list allows any origin.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lookbook=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting lookbook server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = lookbook_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    lookbook_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
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

    // Initialize services
    let state = AppState {
        user_service: UserService::new(
            user_repo.clone(),
            blocking_repo.clone(),
            unblock_request_repo.clone(),
        ),
        token_service: TokenService::new(user_repo.clone(), refresh_token_repo, &config.auth),
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
        setup_service: SetupService::new(user_repo, config.auth.setup_admin_token.clone()),
    };

    if config.auth.setup_admin_token.is_none() {
        info!("Setup endpoints disabled (no setup token configured)");
    }

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.cors))
        .with_state(state);

    // Trailing slashes are trimmed before routing
    let app = NormalizePathLayer::trim_trailing_slash().layer(app);

    // Start server with graceful shutdown
    let ip: IpAddr = config.server.host.parse().unwrap_or_else(|_| {
        warn!(host = %config.server.host, "Invalid host, binding to 0.0.0.0");
        [0, 0, 0, 0].into()
    });
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
