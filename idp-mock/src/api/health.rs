//! Health endpoint.

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub(crate) fn build() -> Router<AppState> {
    Router::new().route("/health", get(|| async { "healthy" }))
}
