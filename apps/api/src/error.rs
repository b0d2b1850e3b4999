mod types;

use axum::Json;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use folio_core::AppError;
use tracing::error;

pub use types::{ErrorResponse, RateLimitResponse};

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        match self.0 {
            AppError::RateLimited {
                message,
                retry_after_seconds,
            } => {
                let mut response = (
                    status,
                    Json(RateLimitResponse {
                        error: message,
                        retry_after: retry_after_seconds,
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
                response
            }
            other => (
                status,
                Json(ErrorResponse {
                    message: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
