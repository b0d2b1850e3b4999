use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use folio_core::{AdminSession, AppError};
use folio_domain::{ConsumeOutcome, RetryAfter};
use tower_sessions::Session;
use tracing::warn;
use url::Url;

use crate::auth::{ADMIN_LOGIN_PATH, SESSION_ADMIN_KEY, client_address, redirect_to_frontend};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const GENERAL_RATE_LIMIT_MESSAGE: &str = "Too many attempts. Please try again later.";
const SIGN_IN_ORIGIN_MESSAGE: &str = "Sign-in request could not be verified. Please try again.";

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Charges the general profile for the calling client before the route runs.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let client = client_address(request.headers());
    let limiter = &state.general_rate_limiter;
    let limit = limiter.policy().points();

    match limiter.consume(client.as_str()).await? {
        ConsumeOutcome::Rejected { ms_before_next, .. } => {
            let retry_after = RetryAfter::from_millis(ms_before_next);
            warn!(
                %client,
                path = %request.uri().path(),
                retry_after_seconds = retry_after.seconds(),
                "request blocked by rate limit"
            );

            let mut response = ApiError::from(AppError::RateLimited {
                message: GENERAL_RATE_LIMIT_MESSAGE.to_owned(),
                retry_after_seconds: retry_after.seconds(),
            })
            .into_response();
            insert_rate_limit_headers(response.headers_mut(), limit, 0, ms_before_next);
            Ok(response)
        }
        ConsumeOutcome::Allowed {
            remaining_points,
            ms_before_next,
        } => {
            let mut response = next.run(request).await;
            insert_rate_limit_headers(
                response.headers_mut(),
                limit,
                remaining_points,
                ms_before_next,
            );
            Ok(response)
        }
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, ms: u64) {
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
    if let Some(reset) = reset_header(ms) {
        headers.insert(X_RATELIMIT_RESET.clone(), reset);
    }
}

fn reset_header(ms_before_next: u64) -> Option<HeaderValue> {
    let delta = Duration::try_milliseconds(i64::try_from(ms_before_next).ok()?)?;
    let reset_at = Utc::now().checked_add_signed(delta)?;
    HeaderValue::from_str(&reset_at.to_rfc3339()).ok()
}

pub async fn require_admin_session(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let admin = session
        .get::<AdminSession>(SESSION_ADMIN_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read admin session: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    if admin.is_expired_at(Utc::now()) {
        session
            .flush()
            .await
            .map_err(|error| AppError::Internal(format!("failed to clear session: {error}")))?;
        return Err(AppError::Unauthorized("session expired".to_owned()).into());
    }

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method()) {
        verify_same_origin(request.headers(), &state.frontend_url)?;
    }

    Ok(next.run(request).await)
}

/// Origin guard for the browser sign-in form.
///
/// A refused submission is sent back to the login page like any other failed
/// sign-in, without charging the limiter.
pub async fn require_same_origin_for_sign_in(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Err(error) = verify_same_origin(request.headers(), &state.frontend_url) {
        warn!(
            client = %client_address(request.headers()),
            %error,
            "sign-in submission failed origin validation"
        );
        let redirect = redirect_to_frontend(
            &state.frontend_url,
            ADMIN_LOGIN_PATH,
            Some(SIGN_IN_ORIGIN_MESSAGE),
        )?;
        return Ok(redirect.into_response());
    }

    Ok(next.run(request).await)
}

fn verify_same_origin(headers: &HeaderMap, frontend_url: &Url) -> Result<(), AppError> {
    if headers
        .get("sec-fetch-site")
        .is_some_and(|fetch_site| fetch_site == "cross-site")
    {
        return Err(AppError::Unauthorized("cross-site request blocked".to_owned()));
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let allowed_origin = frontend_url.origin().ascii_serialization();
    let origin_is_allowed = origin == allowed_origin;
    let referer_is_allowed =
        referer == allowed_origin || referer.starts_with(&format!("{allowed_origin}/"));

    if !origin_is_allowed && !referer_is_allowed {
        return Err(AppError::Unauthorized("origin validation failed".to_owned()));
    }

    Ok(())
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}
