use axum::Json;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderName, StatusCode};
use chrono::Utc;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, [(HeaderName, &'static str); 1], Json<HealthResponse>) {
    let limiter = &state.general_rate_limiter;
    let rate_limit_store = match limiter.health_check().await {
        Ok(()) => HealthDependencyStatus {
            backend: limiter.backend_name(),
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            backend: limiter.backend_name(),
            status: "error",
            detail: Some(error.to_string()),
        },
    };

    let ready = rate_limit_store.status == "ok";
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        [(CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Json(HealthResponse {
            status: if ready { "ok" } else { "error" },
            timestamp: Utc::now().to_rfc3339(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
            rate_limit_store,
        }),
    )
}
