//! HTTP routes
//!
//! - `GET  /health`
//! - `PUT  /api/upload/{filename}?type=PRODUCTS|BRANDS`
//! - `GET  /api/import/tasks/{id}`
//! - `POST /api/import/tasks/{id}/cancel`

pub mod health;
pub mod tasks;
pub mod upload;

use crate::auth::require_auth;
use crate::core::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the combined router
pub fn create_router(state: ServerState) -> Router {
    // Operator API (JWT authenticated)
    let protected = Router::new()
        .route("/api/upload/{filename}", put(upload::upload))
        .route("/api/import/tasks/{id}", get(tasks::get_task))
        .route("/api/import/tasks/{id}/cancel", post(tasks::cancel_task))
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes + MULTIPART_OVERHEAD,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
