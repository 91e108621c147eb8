//! HTTP API layer for lookbook.
//!
//! - **Endpoints**: one router per resource, nested under `/api` by the server
//! - **Extractors**: authenticated, active, and optional viewers
//! - **Middleware**: bearer token authentication and shared state
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
