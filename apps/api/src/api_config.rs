use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use folio_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Backend holding attempt counters, selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStoreConfig {
    /// Process-local counters. Only correct for a single API instance.
    Memory,
    /// Shared counters in Redis.
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProviderConfig {
    pub url: Url,
    pub anon_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: Url,
    pub auth_provider: AuthProviderConfig,
    pub attempt_store: AttemptStoreConfig,
    pub cookie_secure: bool,
    pub log_format: LogFormat,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let env = EnvLookup(lookup);

        let api_host = env.or_default("API_HOST", "127.0.0.1");
        let api_port = env
            .optional("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let frontend_url = env.or_default("FRONTEND_URL", "http://localhost:3000");
        let frontend_url = Url::parse(&frontend_url)
            .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?;

        let auth_url = env.required_non_empty("AUTH_URL")?;
        let auth_provider = AuthProviderConfig {
            url: Url::parse(&auth_url)
                .map_err(|error| AppError::Validation(format!("invalid AUTH_URL: {error}")))?,
            anon_key: env.required_non_empty("AUTH_ANON_KEY")?,
        };

        let attempt_store = match env.or_default("RATE_LIMIT_STORE", "memory").as_str() {
            "memory" => AttemptStoreConfig::Memory,
            "redis" => AttemptStoreConfig::Redis {
                url: env.required_non_empty("REDIS_URL")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_STORE must be either 'memory' or 'redis', got '{other}'"
                )));
            }
        };

        let cookie_secure = env
            .or_default("SESSION_COOKIE_SECURE", "false")
            .eq_ignore_ascii_case("true");

        let log_format = match env.or_default("LOG_FORMAT", "compact").as_str() {
            "compact" => LogFormat::Compact,
            "json" => LogFormat::Json,
            other => {
                return Err(AppError::Validation(format!(
                    "LOG_FORMAT must be either 'compact' or 'json', got '{other}'"
                )));
            }
        };

        Ok(Self {
            api_host,
            api_port,
            frontend_url,
            auth_provider,
            attempt_store,
            cookie_secure,
            log_format,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing(log_format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
    }
}

struct EnvLookup<F>(F);

impl<F: Fn(&str) -> Option<String>> EnvLookup<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_owned())
    }

    fn required_non_empty(&self, name: &str) -> Result<String, AppError> {
        let value = self
            .optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} must not be empty")));
        }

        Ok(value)
    }
}
