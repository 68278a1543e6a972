//! Version 1 of the gateway API.

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub(crate) mod callback;

pub(crate) fn build() -> Router<AppState> {
    Router::new().route("/callback", get(callback::callback))
}
