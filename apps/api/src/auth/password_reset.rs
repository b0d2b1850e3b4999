use axum::Json;
use axum::extract::State;

use crate::dto::{GenericMessageResponse, PasswordResetRequest};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{PASSWORD_UPDATE_PATH, frontend_url};

pub async fn password_reset_handler(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<Json<GenericMessageResponse>> {
    let redirect_to = frontend_url(&state.frontend_url, PASSWORD_UPDATE_PATH, None)?;

    state
        .admin_auth_service
        .request_password_reset(&payload.email, redirect_to.as_str())
        .await?;

    Ok(Json(GenericMessageResponse {
        message: "If an account exists for that email, a reset link has been sent.".to_owned(),
    }))
}
