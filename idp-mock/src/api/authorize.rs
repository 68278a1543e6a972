//! The authorization endpoint.

use axum::extract::{Query, State};
use axum::response::Redirect;
use idgate_types::api::v1::AuthorizeRequest;
use tracing::instrument;

use crate::api::errors::{ApiErrors, ApiResult};
use crate::services::code_store::IssuedCode;
use crate::AppState;

/// `GET /authorize`
///
/// The mock skips the login UI entirely: a valid request immediately gets a
/// fresh single-use code and a redirect back to the registered redirect URI,
/// echoing the caller's `state`.
#[instrument(level = "debug", skip_all)]
pub(crate) async fn authorize(
    State(state): State<AppState>,
    Query(request): Query<AuthorizeRequest>,
) -> ApiResult<Redirect> {
    if request.response_type != "code" {
        return Err(ApiErrors::InvalidRequest(format!(
            "unsupported response_type `{}`",
            request.response_type
        )));
    }
    if !request.scope.split_whitespace().any(|s| s == "openid") {
        return Err(ApiErrors::InvalidRequest(
            "scope must include `openid`".to_string(),
        ));
    }
    if request.client_id != state.config.client_id {
        return Err(ApiErrors::InvalidClient(format!(
            "unknown client `{}`",
            request.client_id
        )));
    }
    if request.redirect_uri != state.config.redirect_uri {
        return Err(ApiErrors::InvalidRequest(
            "redirect_uri is not registered for this client".to_string(),
        ));
    }

    let code = state.codes.issue(IssuedCode {
        nonce: request.nonce.clone(),
        redirect_uri: request.redirect_uri.clone(),
    });
    tracing::debug!("authorization code issued");

    let mut location = url::Url::parse(&request.redirect_uri)
        .map_err(|err| ApiErrors::InvalidRequest(format!("unparsable redirect_uri: {err}")))?;
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code);
        if let Some(request_state) = &request.state {
            pairs.append_pair("state", request_state);
        }
    }
    Ok(Redirect::to(location.as_str()))
}
