use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    pub message: String,
}

/// Body of a `429 Too Many Requests` reply.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rate-limit-response.ts"
)]
pub struct RateLimitResponse {
    pub error: String,
    /// Whole seconds, matching the `Retry-After` header.
    #[ts(type = "number")]
    pub retry_after: u64,
}
