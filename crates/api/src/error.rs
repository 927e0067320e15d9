//! HTTP error rendering.
//!
//! Every failure leaves the API as `{"error": {"code": ..., "message": ...}}`
//! with the status the domain error reports for itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fixedledger_core::period::PeriodError;
use fixedledger_core::posting::PostingError;
use fixedledger_shared::AppError;
use serde_json::json;

/// Error returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Posting, registration or query failure.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Period lock failure.
    #[error(transparent)]
    Period(#[from] PeriodError),

    /// Request-level failure (bad query parameters and the like).
    #[error(transparent)]
    App(#[from] AppError),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn parts(&self) -> (u16, &'static str) {
        match self {
            Self::Posting(err) => (err.http_status_code(), err.error_code()),
            Self::Period(err) => (err.http_status_code(), err.error_code()),
            Self::App(err) => (err.status_code(), err.error_code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixedledger_shared::types::{TenantId, YearMonth};
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_period_locked_renders_423() {
        let err = ApiError::from(PostingError::PeriodLocked {
            tenant_id: TenantId::new(),
            period: YearMonth::new(2024, 3).unwrap(),
        });
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["error"]["code"], "PERIOD_LOCKED");
        assert!(body["error"]["message"].as_str().unwrap().contains("2024-03"));
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = ApiError::from(PostingError::Store("connection reset".to_string()));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_validation_error_renders_400() {
        let err = ApiError::from(AppError::Validation("as_of is required".to_string()));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}
