use std::sync::Arc;
use std::time::Instant;

use folio_application::{AdminAuthService, AttemptStore, Authenticator, RateLimitService};
use folio_core::AppError;
use folio_domain::RateLimitPolicy;
use folio_infrastructure::GoTrueAuthenticator;
use url::Url;

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Wires the production collaborators around an already selected attempt store.
pub fn build_app_state(
    config: &ApiConfig,
    attempt_store: Arc<dyn AttemptStore>,
) -> Result<AppState, AppError> {
    let authenticator = Arc::new(GoTrueAuthenticator::new(
        config.auth_provider.url.clone(),
        config.auth_provider.anon_key.clone(),
    )?);

    Ok(assemble_app_state(
        attempt_store,
        authenticator,
        config.frontend_url.clone(),
    ))
}

/// Both limiters share one store; their policies keep the keys apart.
pub fn assemble_app_state(
    attempt_store: Arc<dyn AttemptStore>,
    authenticator: Arc<dyn Authenticator>,
    frontend_url: Url,
) -> AppState {
    let login_rate_limiter = RateLimitService::new(attempt_store.clone(), RateLimitPolicy::login());
    let general_rate_limiter = RateLimitService::new(attempt_store, RateLimitPolicy::general());

    AppState {
        admin_auth_service: AdminAuthService::new(login_rate_limiter, authenticator),
        general_rate_limiter,
        frontend_url,
        started_at: Instant::now(),
    }
}
