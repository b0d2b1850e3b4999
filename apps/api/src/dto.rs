use std::fmt::{Debug, Formatter};

use folio_core::AdminSession;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    #[ts(type = "number")]
    pub uptime_seconds: u64,
    pub version: &'static str,
    pub rate_limit_store: HealthDependencyStatus,
}

/// Health of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub backend: &'static str,
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Sign-in form fields. Missing fields are treated as empty strings.
#[derive(Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Debug for SignInForm {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SignInForm").finish_non_exhaustive()
    }
}

/// Incoming payload for a password recovery email.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/password-reset-request.ts"
)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Generic acknowledgement payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/generic-message-response.ts"
)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// API representation of the signed-in admin.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/admin-session-response.ts"
)]
pub struct AdminSessionResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: String,
}

impl From<&AdminSession> for AdminSessionResponse {
    fn from(session: &AdminSession) -> Self {
        Self {
            user_id: session.user_id().to_owned(),
            email: session.email().map(ToOwned::to_owned),
            expires_at: session.expires_at().to_rfc3339(),
        }
    }
}
