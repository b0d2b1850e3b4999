//! Process-local attempt store.
//!
//! Counters live in this process only and are lost on restart. Deployments
//! running more than one API instance must use the Redis store instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_application::{AttemptStore, Clock};
use folio_core::AppResult;
use folio_domain::{AttemptRecord, ConsumeOutcome, RateLimitKey, RateLimitPolicy};
use tokio::sync::Mutex;
use tracing::debug;

const PURGE_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct AttemptEntry {
    record: AttemptRecord,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of the attempt store port.
pub struct InMemoryAttemptStore {
    entries: Mutex<HashMap<String, AttemptEntry>>,
    clock: Arc<dyn Clock>,
    operations: AtomicU64,
}

impl InMemoryAttemptStore {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            operations: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        purge(&mut entries, now)
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}

fn purge(entries: &mut HashMap<String, AttemptEntry>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> AppResult<ConsumeOutcome> {
        let storage_key = policy.storage_key(key);

        // The lock spans read, increment, and write for the key.
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        let operation = self.operations.fetch_add(1, Ordering::Relaxed) + 1;
        if operation % PURGE_INTERVAL == 0 {
            let removed = purge(&mut entries, now);
            debug!(removed, "purged expired rate limit records");
        }

        let entry = entries.entry(storage_key).or_insert_with(|| AttemptEntry {
            record: AttemptRecord::new(now),
            expires_at: now,
        });
        let outcome = entry.record.consume(policy, now);
        entry.expires_at = entry.record.expires_at(policy);

        Ok(outcome)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
