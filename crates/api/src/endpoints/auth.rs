//! Token endpoints.

use axum::{Json, Router, extract::State, routing::post};
use lookbook_common::AppResult;
use lookbook_core::TokenPair;
use serde::Deserialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Credentials for a new token pair.
#[derive(Debug, Deserialize)]
pub struct ObtainTokenRequest {
    pub username: String,
    pub password: String,
}

/// Refresh token to rotate.
#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

/// Exchange credentials for an access/refresh pair.
async fn obtain(
    State(state): State<AppState>,
    Json(req): Json<ObtainTokenRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let pair = state
        .token_service
        .obtain(&req.username, &req.password)
        .await?;
    Ok(ApiResponse::ok(pair))
}

/// Rotate a refresh token. The presented token is revoked.
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let pair = state.token_service.refresh(&req.refresh).await?;
    Ok(ApiResponse::ok(pair))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", post(obtain))
        .route("/token/refresh", post(refresh))
}
