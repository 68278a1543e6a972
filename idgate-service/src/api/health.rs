//! Health endpoint.

use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::AppState;

/// `GET /health`, never cached.
pub(crate) fn build() -> Router<AppState> {
    Router::new().route(
        "/health",
        get(|| async { "healthy" }).layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        )),
    )
}
