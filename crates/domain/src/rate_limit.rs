//! Rate limit policies, keys, and the per-key attempt state machine.
//!
//! A key moves through `Fresh -> Counting -> Blocked -> Fresh`. The block is
//! absorbing until its timer elapses; there is no manual unblock.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use folio_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::ClientAddress;

const GENERAL_KEY_PREFIX: &str = "rate_limit";
const LOGIN_KEY_PREFIX: &str = "login_attempt";

/// Point budget, window, and block duration bound to one key namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    key_prefix: String,
    points: u32,
    duration_seconds: u32,
    block_duration_seconds: u32,
}

impl RateLimitPolicy {
    /// Creates a validated policy.
    pub fn new(
        key_prefix: impl Into<String>,
        points: u32,
        duration_seconds: u32,
        block_duration_seconds: u32,
    ) -> AppResult<Self> {
        let key_prefix = NonEmptyString::new(key_prefix)?;

        if points == 0 {
            return Err(AppError::Validation(
                "rate limit points must be greater than zero".to_owned(),
            ));
        }

        if duration_seconds == 0 || block_duration_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit durations must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            key_prefix: key_prefix.into(),
            points,
            duration_seconds,
            block_duration_seconds,
        })
    }

    /// General profile: 5 points per 15 minutes, blocked for 15 minutes.
    #[must_use]
    pub fn general() -> Self {
        Self {
            key_prefix: GENERAL_KEY_PREFIX.to_owned(),
            points: 5,
            duration_seconds: 15 * 60,
            block_duration_seconds: 15 * 60,
        }
    }

    /// Login profile: 3 points per 15 minutes, blocked for 30 minutes.
    #[must_use]
    pub fn login() -> Self {
        Self {
            key_prefix: LOGIN_KEY_PREFIX.to_owned(),
            points: 3,
            duration_seconds: 15 * 60,
            block_duration_seconds: 30 * 60,
        }
    }

    /// Namespace prepended to every key stored under this policy.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        self.key_prefix.as_str()
    }

    /// Attempts admitted per window.
    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Window length in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    /// Block length in seconds.
    #[must_use]
    pub fn block_duration_seconds(&self) -> u32 {
        self.block_duration_seconds
    }

    /// Window length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::seconds(i64::from(self.duration_seconds))
    }

    /// Block length.
    #[must_use]
    pub fn block_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.block_duration_seconds))
    }

    /// Returns the storage key for `key` inside this policy's namespace.
    #[must_use]
    pub fn storage_key(&self, key: &RateLimitKey) -> String {
        format!("{}:{}", self.key_prefix, key.as_str())
    }
}

/// Identifier a rate limit budget is tracked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitKey(NonEmptyString);

impl RateLimitKey {
    /// Creates a key from an arbitrary non-empty subject.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        NonEmptyString::new(value).map(Self)
    }

    /// Composite `"{client}:{email}"` key used by the login gate.
    ///
    /// The email is used exactly as submitted.
    pub fn for_login(client: &ClientAddress, email: &str) -> AppResult<Self> {
        Self::new(format!("{}:{email}", client.as_str()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<RateLimitKey> for String {
    fn from(value: RateLimitKey) -> Self {
        value.0.into()
    }
}

impl Display for RateLimitKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Time remaining before the next attempt is admitted or the window resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RetryAfter(u64);

impl RetryAfter {
    /// Wraps a millisecond delay.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the delay in milliseconds.
    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole seconds, rounded up, never below one.
    #[must_use]
    pub fn seconds(self) -> u64 {
        self.0.div_ceil(1_000).max(1)
    }

    /// Whole minutes, rounded up, never below one.
    #[must_use]
    pub fn minutes(self) -> u64 {
        self.0.div_ceil(60_000).max(1)
    }
}

/// Result of consuming one point for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The attempt fits in the budget.
    Allowed {
        /// Points left in the current window.
        remaining_points: u32,
        /// Milliseconds until the window resets.
        ms_before_next: u64,
    },
    /// The key is blocked.
    Rejected {
        /// Always zero while blocked.
        remaining_points: u32,
        /// Milliseconds until the block ends.
        ms_before_next: u64,
    },
}

impl ConsumeOutcome {
    /// Returns whether the attempt was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Points left in the current window.
    #[must_use]
    pub fn remaining_points(&self) -> u32 {
        match self {
            Self::Allowed {
                remaining_points, ..
            }
            | Self::Rejected {
                remaining_points, ..
            } => *remaining_points,
        }
    }

    /// Delay until the window resets or the block ends.
    #[must_use]
    pub fn retry_after(&self) -> RetryAfter {
        match self {
            Self::Allowed { ms_before_next, .. } | Self::Rejected { ms_before_next, .. } => {
                RetryAfter::from_millis(*ms_before_next)
            }
        }
    }
}

/// Per-key attempt counter.
///
/// `points_consumed` exceeds the policy ceiling only while `blocked_until`
/// is set, and the window is reset only after the block has elapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    points_consumed: u32,
    window_started_at: DateTime<Utc>,
    blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Creates an empty record whose window starts at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            points_consumed: 0,
            window_started_at: now,
            blocked_until: None,
        }
    }

    /// Instant after which the record carries no state worth keeping.
    #[must_use]
    pub fn expires_at(&self, policy: &RateLimitPolicy) -> DateTime<Utc> {
        self.blocked_until
            .unwrap_or_else(|| self.window_started_at + policy.duration())
    }

    /// Returns whether the record has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, policy: &RateLimitPolicy, now: DateTime<Utc>) -> bool {
        self.expires_at(policy) <= now
    }

    /// Consumes one point at `now`.
    pub fn consume(&mut self, policy: &RateLimitPolicy, now: DateTime<Utc>) -> ConsumeOutcome {
        if let Some(blocked_until) = self.blocked_until
            && blocked_until > now
        {
            return ConsumeOutcome::Rejected {
                remaining_points: 0,
                ms_before_next: millis_between(now, blocked_until),
            };
        }

        if self.is_expired(policy, now) {
            *self = Self::new(now);
        }

        self.points_consumed = self.points_consumed.saturating_add(1);

        if self.points_consumed > policy.points() {
            self.blocked_until = Some(now + policy.block_duration());
            return ConsumeOutcome::Rejected {
                remaining_points: 0,
                ms_before_next: u64::from(policy.block_duration_seconds()) * 1_000,
            };
        }

        ConsumeOutcome::Allowed {
            remaining_points: policy.points() - self.points_consumed,
            ms_before_next: millis_between(now, self.window_started_at + policy.duration()),
        }
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::{AttemptRecord, ConsumeOutcome, RateLimitKey, RateLimitPolicy, RetryAfter};
    use crate::ClientAddress;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn policy_rejects_zero_values() {
        assert!(RateLimitPolicy::new("p", 0, 10, 10).is_err());
        assert!(RateLimitPolicy::new("p", 1, 0, 10).is_err());
        assert!(RateLimitPolicy::new("p", 1, 10, 0).is_err());
        assert!(RateLimitPolicy::new(" ", 1, 10, 10).is_err());
        assert!(RateLimitPolicy::new("p", 1, 10, 10).is_ok());
    }

    #[test]
    fn profiles_use_disjoint_namespaces() {
        let key = RateLimitKey::new("1.2.3.4").unwrap_or_else(|_| unreachable!());
        let general = RateLimitPolicy::general().storage_key(&key);
        let login = RateLimitPolicy::login().storage_key(&key);

        assert_eq!(general, "rate_limit:1.2.3.4");
        assert_eq!(login, "login_attempt:1.2.3.4");
    }

    #[test]
    fn login_profile_matches_documented_budget() {
        let policy = RateLimitPolicy::login();
        assert_eq!(policy.points(), 3);
        assert_eq!(policy.duration_seconds(), 900);
        assert_eq!(policy.block_duration_seconds(), 1800);

        let general = RateLimitPolicy::general();
        assert_eq!(general.points(), 5);
        assert_eq!(general.duration_seconds(), 900);
        assert_eq!(general.block_duration_seconds(), 900);
    }

    #[test]
    fn login_key_joins_client_and_email() {
        let key = RateLimitKey::for_login(
            &ClientAddress::Forwarded("1.2.3.4".to_owned()),
            "a@b.com",
        );
        assert_eq!(key.ok().map(String::from), Some("1.2.3.4:a@b.com".to_owned()));

        let unknown = RateLimitKey::for_login(&ClientAddress::Unknown, "");
        assert_eq!(unknown.ok().map(String::from), Some("unknown:".to_owned()));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(RateLimitKey::new("").is_err());
    }

    #[test]
    fn retry_after_rounds_up_with_floor_of_one() {
        assert_eq!(RetryAfter::from_millis(0).seconds(), 1);
        assert_eq!(RetryAfter::from_millis(1).minutes(), 1);
        assert_eq!(RetryAfter::from_millis(1_800_000).minutes(), 30);
        assert_eq!(RetryAfter::from_millis(1_800_001).minutes(), 31);
        assert_eq!(RetryAfter::from_millis(1_500).seconds(), 2);
    }

    #[test]
    fn exceeding_budget_blocks_for_block_duration() {
        let policy = RateLimitPolicy::login();
        let now = epoch();
        let mut record = AttemptRecord::new(now);

        for expected_remaining in [2, 1, 0] {
            let outcome = record.consume(&policy, now);
            assert_eq!(outcome.remaining_points(), expected_remaining);
            assert!(outcome.is_allowed());
        }

        let rejected = record.consume(&policy, now + Duration::seconds(5));
        assert_eq!(
            rejected,
            ConsumeOutcome::Rejected {
                remaining_points: 0,
                ms_before_next: 1_800_000,
            }
        );
        assert_eq!(
            record.blocked_until,
            Some(now + Duration::seconds(5) + Duration::seconds(1800))
        );
    }

    #[test]
    fn blocked_consumption_does_not_increment() {
        let policy = RateLimitPolicy::new("t", 1, 60, 120).unwrap_or_else(|_| unreachable!());
        let now = epoch();
        let mut record = AttemptRecord::new(now);

        record.consume(&policy, now);
        record.consume(&policy, now);
        let consumed = record.points_consumed;

        let outcome = record.consume(&policy, now + Duration::seconds(30));
        assert_eq!(outcome.retry_after().as_millis(), 90_000);
        assert_eq!(record.points_consumed, consumed);
    }

    #[test]
    fn window_expiry_resets_counter() {
        let policy = RateLimitPolicy::new("t", 2, 60, 120).unwrap_or_else(|_| unreachable!());
        let now = epoch();
        let mut record = AttemptRecord::new(now);

        record.consume(&policy, now);
        record.consume(&policy, now);

        let later = now + Duration::seconds(60);
        let outcome = record.consume(&policy, later);
        assert_eq!(
            outcome,
            ConsumeOutcome::Allowed {
                remaining_points: 1,
                ms_before_next: 60_000,
            }
        );
        assert_eq!(record.window_started_at, later);
    }

    #[test]
    fn expired_block_starts_fresh_window() {
        let policy = RateLimitPolicy::login();
        let now = epoch();
        let mut record = AttemptRecord::new(now);

        for _ in 0..4 {
            record.consume(&policy, now);
        }
        assert!(!record.is_expired(&policy, now + Duration::seconds(1799)));

        let after_block = now + Duration::seconds(1801);
        assert!(record.is_expired(&policy, after_block));
        let outcome = record.consume(&policy, after_block);
        assert_eq!(outcome.remaining_points(), 2);
        assert_eq!(record.blocked_until, None);
        assert_eq!(record.window_started_at, after_block);
    }

    proptest! {
        #[test]
        fn first_points_succeed_then_reject(
            points in 1_u32..20,
            duration in 1_u32..3_600,
            block in 1_u32..3_600,
            step_ms in 0_i64..50,
        ) {
            let policy = RateLimitPolicy::new("p", points, duration, block)
                .unwrap_or_else(|_| unreachable!());
            let start = epoch();
            let mut record = AttemptRecord::new(start);
            let mut previous_remaining = u32::MAX;
            let mut now = start;

            for _ in 0..points {
                let outcome = record.consume(&policy, now);
                prop_assert!(outcome.is_allowed());
                prop_assert!(outcome.remaining_points() < previous_remaining);
                previous_remaining = outcome.remaining_points();
                now += Duration::milliseconds(step_ms);
            }

            // Stay inside the window for the rejected attempt.
            let within_window = start + Duration::milliseconds(i64::from(duration) * 1_000 - 1);
            let outcome = record.consume(&policy, now.min(within_window));
            prop_assert!(!outcome.is_allowed());
        }

        #[test]
        fn block_countdown_is_non_increasing_until_release(
            points in 1_u32..5,
            block in 2_u32..600,
            probes in proptest::collection::vec(0_i64..600_000, 1..20),
        ) {
            let policy = RateLimitPolicy::new("p", points, 60, block)
                .unwrap_or_else(|_| unreachable!());
            let start = epoch();
            let mut record = AttemptRecord::new(start);
            for _ in 0..=points {
                record.consume(&policy, start);
            }

            let block_ms = i64::from(block) * 1_000;
            let mut offsets: Vec<i64> = probes
                .into_iter()
                .map(|offset| offset % block_ms)
                .collect();
            offsets.sort_unstable();

            let mut previous = u64::MAX;
            for offset in offsets {
                let outcome = record.consume(&policy, start + Duration::milliseconds(offset));
                prop_assert!(!outcome.is_allowed());
                prop_assert!(outcome.retry_after().as_millis() <= previous);
                previous = outcome.retry_after().as_millis();
            }

            let released = record.consume(&policy, start + Duration::milliseconds(block_ms));
            prop_assert!(released.is_allowed());
            prop_assert_eq!(released.remaining_points(), points - 1);
        }
    }
}
