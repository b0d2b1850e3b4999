use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};

use crate::redis_session_store::RedisSessionStore;

const SESSION_KEY_PREFIX: &str = "folio:session";

/// Session layer for single-instance deployments.
pub fn build_memory_session_layer(cookie_secure: bool) -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), cookie_secure)
}

/// Session layer sharing admin sessions across instances through Redis.
pub fn build_redis_session_layer(
    redis_client: redis::Client,
    cookie_secure: bool,
) -> SessionManagerLayer<RedisSessionStore> {
    configure(
        RedisSessionStore::new(redis_client, SESSION_KEY_PREFIX),
        cookie_secure,
    )
}

fn configure<S: SessionStore + Clone>(store: S, cookie_secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_secure(cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)))
}
