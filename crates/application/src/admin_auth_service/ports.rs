use async_trait::async_trait;

use folio_core::{AdminSession, AppResult};

/// Outcome reported by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationResult {
    /// Credentials accepted; the collaborator issued a session.
    Succeeded(AdminSession),
    /// Credentials refused with the collaborator's message.
    Failed {
        /// Message to show the user verbatim.
        message: String,
    },
}

/// Port for the hosted authentication service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verifies an email and password pair.
    ///
    /// Refused credentials are `Ok(AuthenticationResult::Failed { .. })`;
    /// transport faults are errors.
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthenticationResult>;

    /// Sends a password recovery email linking back to `redirect_to`.
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AppResult<()>;

    /// Revokes the collaborator session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> AppResult<()>;
}
