use async_trait::async_trait;

use folio_core::AppResult;
use folio_domain::{ConsumeOutcome, RateLimitKey, RateLimitPolicy};

/// Store port owning every attempt record.
///
/// Implementations must make `consume` atomic per key: concurrent callers for
/// the same key each observe a distinct consumption count.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Consumes one point for `key` under `policy`.
    ///
    /// Backend faults surface as `AppError::StoreUnavailable`; they never
    /// turn into an admission.
    async fn consume(&self, key: &RateLimitKey, policy: &RateLimitPolicy)
    -> AppResult<ConsumeOutcome>;

    /// Verifies the backend is reachable.
    async fn health_check(&self) -> AppResult<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}
