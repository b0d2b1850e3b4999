use std::time::Instant;

use folio_application::{AdminAuthService, RateLimitService};
use url::Url;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Login admission gate charged with the login profile.
    pub admin_auth_service: AdminAuthService,
    /// Limiter for general endpoints, keyed by client address.
    pub general_rate_limiter: RateLimitService,
    /// Base URL of the site; redirects and origin checks are relative to it.
    pub frontend_url: Url,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}
