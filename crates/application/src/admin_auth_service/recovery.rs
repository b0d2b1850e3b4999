use folio_core::{AppError, AppResult, NonEmptyString};

use super::service::AdminAuthService;

impl AdminAuthService {
    /// Asks the collaborator to email a password recovery link.
    pub async fn request_password_reset(&self, email: &str, redirect_to: &str) -> AppResult<()> {
        let email = NonEmptyString::new(email.trim())
            .map_err(|_| AppError::Validation("email is required".to_owned()))?;

        self.authenticator
            .send_password_reset(email.as_str(), redirect_to)
            .await
    }

    /// Revokes the collaborator session.
    pub async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        self.authenticator.sign_out(access_token).await
    }
}
