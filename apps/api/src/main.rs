//! Folio API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod redis_session_store;
mod state;

use std::sync::Arc;

use axum::Router;
use folio_application::{AttemptStore, Clock};
use folio_core::AppError;
use folio_infrastructure::{InMemoryAttemptStore, RedisAttemptStore, SystemClock};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, AttemptStoreConfig, init_tracing};
use crate::api_router::build_router;
use crate::api_services::{
    build_app_state, build_memory_session_layer, build_redis_client, build_redis_session_layer,
};

const REDIS_KEY_PREFIX: &str = "folio";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::load()?;
    init_tracing(config.log_format);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app = match &config.attempt_store {
        AttemptStoreConfig::Memory => {
            warn!("using in-memory rate limit store; counters are not shared between instances");
            let attempt_store: Arc<dyn AttemptStore> = Arc::new(InMemoryAttemptStore::new(clock));
            let app_state = build_app_state(&config, attempt_store)?;
            build_router(app_state, build_memory_session_layer(config.cookie_secure))?
        }
        AttemptStoreConfig::Redis { url } => {
            let redis_client = build_redis_client(url)?;
            let attempt_store: Arc<dyn AttemptStore> = Arc::new(RedisAttemptStore::new(
                redis_client.clone(),
                REDIS_KEY_PREFIX,
                clock,
            ));
            let app_state = build_app_state(&config, attempt_store)?;
            build_router(
                app_state,
                build_redis_session_layer(redis_client, config.cookie_secure),
            )?
        }
    };

    serve(&config, app).await
}

async fn serve(config: &ApiConfig, app: Router) -> Result<(), AppError> {
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "folio-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
