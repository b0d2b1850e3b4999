//! Authentication collaborator backed by the hosted GoTrue REST API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use folio_application::{AuthenticationResult, Authenticator};
use folio_core::{AdminSession, AppError, AppResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

const FALLBACK_FAILURE_MESSAGE: &str = "Invalid login credentials";

/// HTTP implementation of the authenticator port.
#[derive(Clone)]
pub struct GoTrueAuthenticator {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AdminSession {
        let expires_at = self
            .expires_at
            .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in));

        AdminSession::new(
            self.user.id,
            self.user.email,
            self.access_token,
            self.refresh_token,
            expires_at,
        )
    }
}

impl GoTrueAuthenticator {
    /// Creates an authenticator for the project at `base_url`.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build auth http client: {error}"))
            })?;

        Ok(Self {
            http_client,
            base_url: with_trailing_slash(base_url),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|error| AppError::Internal(format!("invalid auth endpoint '{path}': {error}")))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Extracts the human-readable message from a GoTrue error body.
fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    ["error_description", "msg", "message", "error"]
        .into_iter()
        .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map(ToOwned::to_owned)
}

#[async_trait]
impl Authenticator for GoTrueAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<AuthenticationResult> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("auth request failed: {error}")))?;

        let status = response.status();
        if status.is_success() {
            let token = response.json::<TokenResponse>().await.map_err(|error| {
                AppError::Internal(format!("failed to decode auth token response: {error}"))
            })?;
            return Ok(AuthenticationResult::Succeeded(
                token.into_session(Utc::now()),
            ));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            debug!(%status, "auth provider refused credentials");
            return Ok(AuthenticationResult::Failed {
                message: provider_message(&body)
                    .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_owned()),
            });
        }

        warn!(%status, "auth provider returned server error");
        Err(AppError::Internal(format!("auth provider returned {status}")))
    }

    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> AppResult<()> {
        let mut url = self.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&RecoverRequest { email })
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("recover request failed: {error}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = provider_message(&body).unwrap_or_else(|| status.to_string());
        if status.is_client_error() {
            return Err(AppError::Validation(message));
        }

        Err(AppError::Internal(format!(
            "auth provider returned {status} for recover: {message}"
        )))
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let url = self.endpoint("auth/v1/logout")?;

        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("logout request failed: {error}")))?;

        let status = response.status();
        // An already revoked token is as good as a revoked one.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        Err(AppError::Internal(format!(
            "auth provider returned {status} for logout"
        )))
    }
}
