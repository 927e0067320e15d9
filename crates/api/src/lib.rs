//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the posting coordinator and period lock manager
//! - JSON error rendering shared by every route

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use fixedledger_core::period::PeriodLockManager;
use fixedledger_core::posting::PostingCoordinator;
use fixedledger_shared::AppError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Posting coordinator; the only mutating path for depreciation.
    pub coordinator: Arc<PostingCoordinator>,
    /// Period lock manager, shared with the coordinator.
    pub locks: Arc<PeriodLockManager>,
}

impl AppState {
    /// Builds state around a coordinator, reusing its lock manager.
    #[must_use]
    pub fn new(coordinator: PostingCoordinator) -> Self {
        let locks = Arc::new(coordinator.locks().clone());
        Self {
            coordinator: Arc::new(coordinator),
            locks,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .nest("/api/v1", routes::api_routes())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> ApiError {
    AppError::NotFound {
        resource: "route",
        key: uri.path().to_string(),
    }
    .into()
}
