//! The HTTP API of the authentication gateway.

use axum::Router;

use crate::AppState;

pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod info;
pub(crate) mod v1;

/// Builds the full router: versioned API plus unversioned health and version
/// endpoints.
pub(crate) fn build() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", v1::build())
        .merge(health::build())
        .merge(info::build())
}
