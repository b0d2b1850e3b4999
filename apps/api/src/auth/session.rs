use axum::Json;
use axum::extract::{Extension, State};
use axum::response::Redirect;
use folio_core::{AdminSession, AppError};
use tower_sessions::Session;
use tracing::warn;

use crate::dto::AdminSessionResponse;
use crate::error::ApiResult;
use crate::state::AppState;

use super::{ADMIN_LOGIN_PATH, SESSION_ADMIN_KEY, redirect_to_frontend};

pub async fn session_handler(
    Extension(admin): Extension<AdminSession>,
) -> Json<AdminSessionResponse> {
    Json(AdminSessionResponse::from(&admin))
}

pub async fn signout_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Redirect> {
    let admin = session
        .get::<AdminSession>(SESSION_ADMIN_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session: {error}")))?;

    if let Some(admin) = admin
        && let Err(error) = state.admin_auth_service.sign_out(admin.access_token()).await
    {
        warn!(%error, "failed to revoke auth provider session");
    }

    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear session: {error}")))?;

    redirect_to_frontend(&state.frontend_url, ADMIN_LOGIN_PATH, None)
}
