//! The HTTP API of the mock identity provider.

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub(crate) mod authorize;
pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod token;

pub(crate) fn build() -> Router<AppState> {
    Router::new()
        .route("/authorize", get(authorize::authorize))
        .route("/token", post(token::token))
        .merge(health::build())
}
