//! The authorization callback endpoint.

use axum::extract::{Query, State};
use axum::Json;
use idgate_types::api::v1::CallbackResponse;
use serde::Deserialize;
use tracing::instrument;

use crate::api::errors::{ApiErrors, ApiResult};
use crate::services::gateway::AuthGatewayService;

/// Query parameters of the callback redirect.
///
/// `code` is optional so the handler, not the extractor, decides how a bare
/// callback is answered.
#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
}

/// `GET /api/v1/callback?code=..`
///
/// Exchanges the one-time authorization code for a verified identity token.
#[instrument(level = "debug", skip_all)]
pub(crate) async fn callback(
    State(gateway): State<AuthGatewayService>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Json<CallbackResponse>> {
    let code = match query.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => return Err(ApiErrors::MissingCode),
    };
    let response = gateway.authenticate(code).await?;
    Ok(Json(response))
}
