//! Financial period lock routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use fixedledger_shared::types::{TenantId, UserId};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the period routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/periods/{year}/{month}", get(get_period))
        .route(
            "/tenants/{tenant_id}/periods/{year}/{month}/lock",
            post(lock_period),
        )
        .route(
            "/tenants/{tenant_id}/periods/{year}/{month}/unlock",
            post(unlock_period),
        )
}

/// Request body for a lock or unlock.
#[derive(Debug, Deserialize)]
pub struct PeriodActionRequest {
    /// User performing the transition.
    pub actor: UserId,
}

/// GET `/tenants/{tenant_id}/periods/{year}/{month}` - State plus transition history.
async fn get_period(
    State(state): State<AppState>,
    Path((tenant_id, year, month)): Path<(TenantId, i32, u32)>,
) -> ApiResult<impl IntoResponse> {
    let status = state.locks.status(tenant_id, year, month).await?;
    Ok(Json(status))
}

/// POST `/tenants/{tenant_id}/periods/{year}/{month}/lock`
async fn lock_period(
    State(state): State<AppState>,
    Path((tenant_id, year, month)): Path<(TenantId, i32, u32)>,
    Json(payload): Json<PeriodActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let period = state.locks.lock(tenant_id, year, month, payload.actor).await?;
    info!(%tenant_id, period = %period.period, actor = %payload.actor, "Period locked via API");
    Ok(Json(period))
}

/// POST `/tenants/{tenant_id}/periods/{year}/{month}/unlock`
async fn unlock_period(
    State(state): State<AppState>,
    Path((tenant_id, year, month)): Path<(TenantId, i32, u32)>,
    Json(payload): Json<PeriodActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let period = state
        .locks
        .unlock(tenant_id, year, month, payload.actor)
        .await?;
    info!(%tenant_id, period = %period.period, actor = %payload.actor, "Period unlocked via API");
    Ok(Json(period))
}
