use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use folio_core::AppError;
use tower_http::cors::CorsLayer;
use url::Url;

pub(super) fn build_cors_layer(frontend_url: &Url) -> Result<CorsLayer, AppError> {
    let origin = frontend_url.origin().ascii_serialization();

    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&origin)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}
