//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod client;
mod rate_limit;

pub use client::{ClientAddress, UNKNOWN_CLIENT};
pub use rate_limit::{AttemptRecord, ConsumeOutcome, RateLimitKey, RateLimitPolicy, RetryAfter};
