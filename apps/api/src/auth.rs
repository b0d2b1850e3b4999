use axum::response::Redirect;
use folio_core::AppError;
use url::Url;

use crate::error::ApiResult;

mod password_reset;
mod request_context;
mod session;
mod signin;

pub use password_reset::password_reset_handler;
pub(crate) use request_context::client_address;
pub use session::{session_handler, signout_handler};
pub use signin::signin_handler;

/// Session key holding the signed-in [`folio_core::AdminSession`].
pub const SESSION_ADMIN_KEY: &str = "admin_session";

pub(crate) const ADMIN_LANDING_PATH: &str = "/admin";
pub(crate) const ADMIN_LOGIN_PATH: &str = "/admin/login";
pub(crate) const PASSWORD_UPDATE_PATH: &str = "/admin/update-password";

/// Resolves `path` against the frontend, optionally carrying an `error` query parameter.
pub(crate) fn frontend_url(base: &Url, path: &str, error: Option<&str>) -> Result<Url, AppError> {
    let mut url = base
        .join(path)
        .map_err(|error| AppError::Internal(format!("invalid frontend path '{path}': {error}")))?;

    if let Some(error) = error {
        url.query_pairs_mut().append_pair("error", error);
    }

    Ok(url)
}

pub(crate) fn redirect_to_frontend(
    base: &Url,
    path: &str,
    error: Option<&str>,
) -> ApiResult<Redirect> {
    let url = frontend_url(base, path, error)?;
    Ok(Redirect::to(url.as_str()))
}
