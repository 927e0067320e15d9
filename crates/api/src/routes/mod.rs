//! API route definitions.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::AppState;

pub mod assets;
pub mod periods;


/// Creates the liveness route, mounted outside the versioned prefix.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Creates the versioned API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(assets::routes())
        .merge(periods::routes())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fixedledger",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
