//! Version endpoint.

use axum::routing::get;
use axum::Router;

use crate::AppState;

/// `GET /version` returns name and version of the running build.
pub(crate) fn build() -> Router<AppState> {
    Router::new().route("/version", get(|| async { crate::version_info() }))
}
