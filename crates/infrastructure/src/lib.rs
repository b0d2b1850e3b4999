//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod gotrue_authenticator;
mod in_memory_attempt_store;
mod redis_attempt_store;
mod system_clock;

pub use gotrue_authenticator::GoTrueAuthenticator;
pub use in_memory_attempt_store::InMemoryAttemptStore;
pub use redis_attempt_store::RedisAttemptStore;
pub use system_clock::SystemClock;
