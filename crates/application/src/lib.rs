//! Application services and ports.

#![forbid(unsafe_code)]

mod admin_auth_service;
mod clock;
mod rate_limit_service;

pub use admin_auth_service::{
    AdminAuthService, AuthenticationResult, Authenticator, LoginAttempt, LoginOutcome,
};
pub use clock::Clock;
pub use rate_limit_service::{AttemptStore, RateLimitService};
