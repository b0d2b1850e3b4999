use std::sync::Arc;

use folio_core::AppResult;
use folio_domain::{ConsumeOutcome, RateLimitKey, RateLimitPolicy};

use super::ports::AttemptStore;

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn AttemptStore>,
    policy: RateLimitPolicy,
}

impl RateLimitService {
    /// Creates a limiter enforcing `policy` on top of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AttemptStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the policy this limiter enforces.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Consumes one point for `subject`.
    ///
    /// A rejection is reported as `Ok(ConsumeOutcome::Rejected { .. })`, never
    /// retried or delayed here. Only store faults are errors.
    pub async fn consume(&self, subject: &str) -> AppResult<ConsumeOutcome> {
        let key = RateLimitKey::new(subject)?;
        self.consume_key(&key).await
    }

    /// Consumes one point for an already validated key.
    pub async fn consume_key(&self, key: &RateLimitKey) -> AppResult<ConsumeOutcome> {
        self.store.consume(key, &self.policy).await
    }

    /// Verifies the backing store is reachable.
    pub async fn health_check(&self) -> AppResult<()> {
        self.store.health_check().await
    }

    /// Returns the backing store's name.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
