//! Fixed asset and depreciation routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use fixedledger_core::depreciation::NewFixedAsset;
use fixedledger_core::posting::PostingOutcome;
use fixedledger_shared::AppError;
use fixedledger_shared::types::{AssetId, TenantId, UserId};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;

/// Creates the asset routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/assets", post(register_asset))
        .route("/assets/{asset_id}/schedule", get(get_schedule))
        .route(
            "/assets/{asset_id}/depreciation",
            get(preview_depreciation).post(post_depreciation),
        )
        .route("/assets/{asset_id}/entries", get(list_entries))
        .route("/tenants/{tenant_id}/depreciation-runs", post(run_batch))
}

/// Query for a depreciation dry run.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Target date (YYYY-MM-DD).
    pub as_of: Option<String>,
}

/// Request body for posting depreciation, one asset or a whole tenant.
#[derive(Debug, Deserialize)]
pub struct PostDepreciationRequest {
    /// Target date (YYYY-MM-DD).
    pub as_of: NaiveDate,
    /// User performing the posting.
    pub actor: UserId,
}

fn parse_as_of(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw.ok_or_else(|| AppError::Validation("as_of is required".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("as_of must be YYYY-MM-DD, got {raw}")))
}

/// POST `/assets` - Register a fixed asset.
async fn register_asset(
    State(state): State<AppState>,
    Json(payload): Json<NewFixedAsset>,
) -> ApiResult<impl IntoResponse> {
    let asset = state.coordinator.register_asset(payload).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// GET `/assets/{asset_id}/schedule` - Full projected schedule.
async fn get_schedule(
    State(state): State<AppState>,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<impl IntoResponse> {
    let lines = state.coordinator.schedule(asset_id).await?;
    Ok(Json(lines))
}

/// GET `/assets/{asset_id}/depreciation?as_of=` - What a post would do, without posting.
async fn preview_depreciation(
    State(state): State<AppState>,
    Path(asset_id): Path<AssetId>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<impl IntoResponse> {
    let as_of = parse_as_of(query.as_of.as_deref())?;
    let outcome = state.coordinator.calculate(asset_id, as_of).await?;
    Ok(Json(outcome))
}

/// POST `/assets/{asset_id}/depreciation` - Post depreciation owed as of a date.
async fn post_depreciation(
    State(state): State<AppState>,
    Path(asset_id): Path<AssetId>,
    Json(payload): Json<PostDepreciationRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .coordinator
        .post(asset_id, payload.as_of, payload.actor)
        .await?;

    let status = match &outcome {
        PostingOutcome::Posted(receipt) => {
            info!(
                %asset_id,
                entry_id = %receipt.entry.id,
                amount = %receipt.entry.amount,
                "Depreciation posted via API"
            );
            StatusCode::CREATED
        }
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// GET `/assets/{asset_id}/entries` - Posted entries, oldest first.
async fn list_entries(
    State(state): State<AppState>,
    Path(asset_id): Path<AssetId>,
) -> ApiResult<impl IntoResponse> {
    let entries = state.coordinator.entries(asset_id).await?;
    Ok(Json(entries))
}

/// POST `/tenants/{tenant_id}/depreciation-runs` - Post every active asset.
async fn run_batch(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    Json(payload): Json<PostDepreciationRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = state
        .coordinator
        .run_batch(tenant_id, payload.as_of, payload.actor)
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("2024-04-01"), true)]
    #[case(Some("2024-13-01"), false)]
    #[case(Some("04/01/2024"), false)]
    #[case(None, false)]
    fn test_parse_as_of(#[case] raw: Option<&str>, #[case] ok: bool) {
        assert_eq!(parse_as_of(raw).is_ok(), ok);
    }
}
