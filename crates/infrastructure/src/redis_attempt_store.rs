//! Redis-backed attempt store shared by every API instance.

use std::sync::Arc;

use async_trait::async_trait;
use folio_application::{AttemptStore, Clock};
use folio_core::{AppError, AppResult};
use folio_domain::{ConsumeOutcome, RateLimitKey, RateLimitPolicy};
use redis::{AsyncCommands, Script};
use tracing::warn;

// Runs the whole read-increment-write on the Redis server, so concurrent
// callers from any process are serialized per key.
const CONSUME_SCRIPT: &str = r#"
local key = KEYS[1]
local points = tonumber(ARGV[1])
local duration_ms = tonumber(ARGV[2])
local block_ms = tonumber(ARGV[3])
local now = tonumber(ARGV[4])

local state = redis.call('HMGET', key, 'consumed', 'window_started', 'blocked_until')
local consumed = tonumber(state[1]) or 0
local window_started = tonumber(state[2]) or now
local blocked_until = tonumber(state[3]) or 0

if blocked_until > now then
  return {0, 0, blocked_until - now}
end

if blocked_until > 0 or window_started + duration_ms <= now then
  consumed = 0
  window_started = now
end

consumed = consumed + 1

if consumed > points then
  redis.call('HSET', key, 'consumed', consumed, 'window_started', window_started, 'blocked_until', now + block_ms)
  redis.call('PEXPIRE', key, block_ms)
  return {0, 0, block_ms}
end

local resets_in = window_started + duration_ms - now
redis.call('HSET', key, 'consumed', consumed, 'window_started', window_started, 'blocked_until', 0)
redis.call('PEXPIRE', key, resets_in)
return {1, points - consumed, resets_in}
"#;

/// Redis implementation of the attempt store port.
#[derive(Clone)]
pub struct RedisAttemptStore {
    client: redis::Client,
    key_prefix: String,
    clock: Arc<dyn Clock>,
    script: Arc<Script>,
}

impl RedisAttemptStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            clock,
            script: Arc::new(Script::new(CONSUME_SCRIPT)),
        }
    }

    fn key_for(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> String {
        format!("{}:{}", self.key_prefix, policy.storage_key(key))
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                warn!(%error, "rate limit store connection failed");
                AppError::StoreUnavailable(format!("failed to connect to redis: {error}"))
            })
    }
}

fn decode_outcome(reply: (i64, i64, i64)) -> AppResult<ConsumeOutcome> {
    let (allowed, remaining_points, ms_before_next) = reply;

    let remaining_points = u32::try_from(remaining_points).map_err(|error| {
        AppError::StoreUnavailable(format!("invalid redis remaining points: {error}"))
    })?;
    let ms_before_next = u64::try_from(ms_before_next).map_err(|error| {
        AppError::StoreUnavailable(format!("invalid redis retry delay: {error}"))
    })?;

    Ok(match allowed {
        1 => ConsumeOutcome::Allowed {
            remaining_points,
            ms_before_next,
        },
        _ => ConsumeOutcome::Rejected {
            remaining_points,
            ms_before_next,
        },
    })
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn consume(
        &self,
        key: &RateLimitKey,
        policy: &RateLimitPolicy,
    ) -> AppResult<ConsumeOutcome> {
        let redis_key = self.key_for(key, policy);
        let now_ms = self.clock.now().timestamp_millis();
        let mut connection = self.connection().await?;

        let reply: (i64, i64, i64) = self
            .script
            .key(redis_key)
            .arg(policy.points())
            .arg(u64::from(policy.duration_seconds()) * 1_000)
            .arg(u64::from(policy.block_duration_seconds()) * 1_000)
            .arg(now_ms)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                warn!(%error, "rate limit consume script failed");
                AppError::StoreUnavailable(format!(
                    "failed to record redis rate limit attempt: {error}"
                ))
            })?;

        decode_outcome(reply)
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let response: String = connection.ping().await.map_err(|error| {
            AppError::StoreUnavailable(format!("redis ping failed: {error}"))
        })?;

        if !response.eq_ignore_ascii_case("pong") {
            return Err(AppError::StoreUnavailable(format!(
                "unexpected redis ping response: {response}"
            )));
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
