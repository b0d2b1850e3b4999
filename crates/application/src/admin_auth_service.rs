//! Login admission gate for the admin panel.
//!
//! Every password sign-in is charged against the login rate limit profile,
//! keyed by `"{client}:{email}"`, before the credentials are forwarded to the
//! authentication collaborator. Failed credentials still cost a point.

mod ports;
mod recovery;
mod service;

#[cfg(test)]
mod tests;

pub use ports::{AuthenticationResult, Authenticator};
pub use service::{AdminAuthService, LoginAttempt, LoginOutcome};
