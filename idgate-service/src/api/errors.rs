//! API error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::services::gateway::GatewayError;

pub(crate) type ApiResult<T> = Result<T, ApiErrors>;

/// Every error the API surfaces to callers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiErrors {
    /// The callback arrived without an authorization code.
    #[error("no authorization code received")]
    MissingCode,
    /// The identity provider rejected the exchange; its status and body are
    /// forwarded so callers can see the OAuth error.
    #[error("token exchange failed: {body}")]
    UpstreamRejected { status: u16, body: String },
    /// The pipeline failed server-side (transport, decryption, verification).
    #[error("{0}")]
    GatewayFailure(String),
    /// Unexpected internal error.
    #[error(transparent)]
    InternalServerError(#[from] eyre::Report),
}

impl From<GatewayError> for ApiErrors {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Exchange(
                crate::services::exchange::ExchangeError::ProviderRejected { status, body },
            ) => ApiErrors::UpstreamRejected {
                status: status.as_u16(),
                body,
            },
            GatewayError::Exchange(err) => {
                ApiErrors::GatewayFailure(format!("token exchange failed: {err}"))
            }
            GatewayError::Token(err) => ApiErrors::GatewayFailure(err.to_string()),
            GatewayError::Assertion(err) => {
                ApiErrors::GatewayFailure(format!("failed to build client assertion: {err}"))
            }
        }
    }
}

impl IntoResponse for ApiErrors {
    fn into_response(self) -> Response {
        match self {
            ApiErrors::MissingCode => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            ApiErrors::UpstreamRejected { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                format!("token exchange failed: {body}"),
            )
                .into_response(),
            ApiErrors::GatewayFailure(message) => {
                tracing::warn!("authentication pipeline failed: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
            ApiErrors::InternalServerError(report) => handle_internal_server_error(report),
        }
    }
}

/// Logs the full report under a fresh error id and returns only that id to
/// the caller.
fn handle_internal_server_error(report: eyre::Report) -> Response {
    let error_id = Uuid::new_v4();
    tracing::error!("internal server error (id {error_id}): {report:?}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("internal server error (id {error_id})"),
    )
        .into_response()
}
