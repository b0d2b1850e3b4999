mod cors;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use folio_core::AppError;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;
use crate::{auth, handlers, middleware};

use self::cors::build_cors_layer;

pub fn build_router<S>(
    app_state: AppState,
    session_layer: SessionManagerLayer<S>,
) -> Result<Router, AppError>
where
    S: SessionStore + Clone,
{
    let cors_layer = build_cors_layer(&app_state.frontend_url)?;

    let general_rate_limited_routes = Router::new()
        .route(
            "/auth/reset-password",
            post(auth::password_reset_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ));

    let protected_routes = Router::new()
        .route("/auth/session", get(auth::session_handler))
        .route_layer(from_fn(middleware::require_admin_session));

    let sign_in_routes = Router::new()
        .route("/auth/signin", post(auth::signin_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_sign_in,
        ));

    let session_routes = Router::new()
        .route("/auth/signout", post(auth::signout_handler))
        .merge(general_rate_limited_routes)
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ));

    Ok(Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .merge(sign_in_routes)
        .merge(session_routes)
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state))
}
