use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Redirect;
use folio_application::{LoginAttempt, LoginOutcome};
use folio_core::AppError;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::dto::SignInForm;
use crate::error::ApiResult;
use crate::state::AppState;

use super::{
    ADMIN_LANDING_PATH, ADMIN_LOGIN_PATH, SESSION_ADMIN_KEY, client_address, redirect_to_frontend,
};

pub async fn signin_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<SignInForm>,
) -> ApiResult<Redirect> {
    let client = client_address(&headers);
    let attempt = LoginAttempt {
        email: form.email,
        password: form.password,
        client: client.clone(),
    };

    match state.admin_auth_service.sign_in(attempt).await? {
        LoginOutcome::Admitted(admin) => {
            session.cycle_id().await.map_err(|error| {
                AppError::Internal(format!("failed to rotate session id: {error}"))
            })?;
            session
                .insert(SESSION_ADMIN_KEY, admin)
                .await
                .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))?;

            info!(%client, "admin signed in");
            redirect_to_frontend(&state.frontend_url, ADMIN_LANDING_PATH, None)
        }
        LoginOutcome::RateLimitExceeded { retry_after } => {
            warn!(
                %client,
                retry_after_seconds = retry_after.seconds(),
                "login attempt blocked by rate limit"
            );
            let message = LoginOutcome::rate_limit_message(retry_after);
            redirect_to_frontend(&state.frontend_url, ADMIN_LOGIN_PATH, Some(&message))
        }
        LoginOutcome::AuthenticationFailed { message } => {
            info!(%client, "admin sign-in refused by auth provider");
            redirect_to_frontend(&state.frontend_url, ADMIN_LOGIN_PATH, Some(&message))
        }
    }
}
