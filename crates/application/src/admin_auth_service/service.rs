use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use folio_core::{AdminSession, AppResult};
use folio_domain::{ClientAddress, ConsumeOutcome, RateLimitKey, RetryAfter};

use crate::RateLimitService;

use super::ports::{AuthenticationResult, Authenticator};

/// Credentials submitted through the sign-in form.
#[derive(Clone)]
pub struct LoginAttempt {
    /// Submitted email, used verbatim.
    pub email: String,
    /// Submitted password.
    pub password: String,
    /// Origin of the submission.
    pub client: ClientAddress,
}

impl Debug for LoginAttempt {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LoginAttempt")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Result of a sign-in attempt at the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted.
    Admitted(AdminSession),
    /// The key is blocked; the collaborator was not called.
    RateLimitExceeded {
        /// Delay before the key is admitted again.
        retry_after: RetryAfter,
    },
    /// The collaborator refused the credentials. One point was still consumed.
    AuthenticationFailed {
        /// Collaborator message, verbatim.
        message: String,
    },
}

impl LoginOutcome {
    /// User-facing text for a blocked key.
    #[must_use]
    pub fn rate_limit_message(retry_after: RetryAfter) -> String {
        format!(
            "Too many login attempts. Please try again in {} minutes.",
            retry_after.minutes()
        )
    }
}

/// Application service gating admin authentication.
#[derive(Clone)]
pub struct AdminAuthService {
    pub(super) rate_limiter: RateLimitService,
    pub(super) authenticator: Arc<dyn Authenticator>,
}

impl AdminAuthService {
    /// Creates the gate. `rate_limiter` should carry the login profile.
    #[must_use]
    pub fn new(rate_limiter: RateLimitService, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            rate_limiter,
            authenticator,
        }
    }

    /// Admits or rejects a sign-in attempt.
    ///
    /// The limiter is charged first; the collaborator is only called when the
    /// key still has budget. Store faults propagate as errors so an
    /// unreachable store never admits anyone.
    pub async fn sign_in(&self, attempt: LoginAttempt) -> AppResult<LoginOutcome> {
        let key = RateLimitKey::for_login(&attempt.client, &attempt.email)?;

        if let ConsumeOutcome::Rejected { ms_before_next, .. } =
            self.rate_limiter.consume_key(&key).await?
        {
            return Ok(LoginOutcome::RateLimitExceeded {
                retry_after: RetryAfter::from_millis(ms_before_next),
            });
        }

        match self
            .authenticator
            .authenticate(&attempt.email, &attempt.password)
            .await?
        {
            AuthenticationResult::Succeeded(session) => Ok(LoginOutcome::Admitted(session)),
            AuthenticationResult::Failed { message } => {
                Ok(LoginOutcome::AuthenticationFailed { message })
            }
        }
    }
}
