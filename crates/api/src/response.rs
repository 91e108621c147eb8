//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
///
/// Errors are rendered by `AppError` itself, so this only carries success
/// payloads.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a `200 OK` response.
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// Create a `201 Created` response.
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }

    /// `201` when something new was written, `200` otherwise.
    pub const fn created_if(created: bool, data: T) -> Self {
        if created {
            Self::created(data)
        } else {
            Self::ok(data)
        }
    }

    /// Status code this response will be sent with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Result of a toggle endpoint.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: lookbook_core::Toggle,
    pub count: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(MessageResponse::new("done"))).unwrap();
        assert_eq!(body, serde_json::json!({"data": {"message": "done"}}));
    }

    #[test]
    fn test_created_if() {
        assert_eq!(ApiResponse::created_if(true, ()).status(), StatusCode::CREATED);
        assert_eq!(ApiResponse::created_if(false, ()).status(), StatusCode::OK);
    }
}
