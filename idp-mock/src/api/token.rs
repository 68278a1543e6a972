//! The token endpoint.

use axum::extract::State;
use axum::{Form, Json};
use idgate_types::api::v1::{
    TokenRequest, TokenResponse, CLIENT_ASSERTION_TYPE_JWT_BEARER, GRANT_TYPE_AUTHORIZATION_CODE,
};
use tracing::instrument;

use crate::api::errors::{ApiErrors, ApiResult};
use crate::services::token_issuer::IssueError;
use crate::AppState;

/// `POST /token`
///
/// Redeems a single-use authorization code for an encrypted identity token.
/// Every check mirrors a real provider: grant and assertion types, client
/// identity, assertion signature and audience, code freshness, and a
/// byte-for-byte redirect URI match.
#[instrument(level = "debug", skip_all)]
pub(crate) async fn token(
    State(state): State<AppState>,
    Form(request): Form<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if request.grant_type != GRANT_TYPE_AUTHORIZATION_CODE {
        return Err(ApiErrors::InvalidRequest(format!(
            "unsupported grant_type `{}`",
            request.grant_type
        )));
    }
    if request.client_assertion_type != CLIENT_ASSERTION_TYPE_JWT_BEARER {
        return Err(ApiErrors::InvalidRequest(format!(
            "unsupported client_assertion_type `{}`",
            request.client_assertion_type
        )));
    }
    if request.client_id != state.config.client_id {
        return Err(ApiErrors::InvalidClient(format!(
            "unknown client `{}`",
            request.client_id
        )));
    }
    if let Err(err) = state.issuer.verify_client_assertion(&request.client_assertion) {
        return Err(ApiErrors::InvalidClient(err.to_string()));
    }

    let Some(issued) = state.codes.redeem(&request.code) else {
        return Err(ApiErrors::InvalidGrant(
            "authorization code is unknown or already redeemed".to_string(),
        ));
    };
    if issued.redirect_uri != request.redirect_uri {
        return Err(ApiErrors::InvalidGrant(
            "redirect_uri does not match the authorization request".to_string(),
        ));
    }

    let id_token = state.issuer.issue(issued.nonce).map_err(|err| match err {
        IssueError::BadAssertion(msg) => ApiErrors::InvalidClient(msg),
        other => ApiErrors::InternalServerError(other.into()),
    })?;
    tracing::debug!("identity token issued");
    Ok(Json(TokenResponse { id_token }))
}
