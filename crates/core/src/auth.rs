use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Admin session issued by the authentication collaborator and persisted in
/// the HTTP session after a successful sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    user_id: String,
    email: Option<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Creates a session from the collaborator's token grant.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        email: Option<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Returns the collaborator's stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the bearer token used against the collaborator.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Returns the refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Returns when the access token stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// Tokens stay out of logs.
impl Debug for AdminSession {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AdminSession")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::AdminSession;

    fn session() -> AdminSession {
        let expires_at = Utc
            .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        AdminSession::new(
            "user-1",
            Some("admin@example.com".to_owned()),
            "access-secret",
            "refresh-secret",
            expires_at,
        )
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", session());
        assert!(rendered.contains("user-1"));
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
    }

    #[test]
    fn expiry_is_inclusive() {
        let session = session();
        assert!(session.is_expired_at(session.expires_at()));
        assert!(!session.is_expired_at(session.expires_at() - Duration::seconds(1)));
    }

    #[test]
    fn session_survives_json_round_trip() {
        let session = session();
        let decoded = serde_json::to_string(&session)
            .ok()
            .and_then(|encoded| serde_json::from_str::<AdminSession>(&encoded).ok());
        assert_eq!(decoded, Some(session));
    }
}
