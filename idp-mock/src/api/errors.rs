//! OAuth-shaped error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idgate_types::api::v1::ProviderError;
use uuid::Uuid;

pub(crate) type ApiResult<T> = Result<T, ApiErrors>;

/// Every error the mock provider surfaces.
///
/// OAuth errors become a `400` with a `{"error", "error_description"}`
/// body, matching what real providers answer.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiErrors {
    /// The request itself is malformed or inconsistent.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    /// The authorization code is unknown, consumed or bound differently.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    /// The client or its assertion could not be authenticated.
    #[error("invalid_client: {0}")]
    InvalidClient(String),
    /// Unexpected internal error.
    #[error(transparent)]
    InternalServerError(#[from] eyre::Report),
}

impl ApiErrors {
    fn oauth_body(code: &str, description: &str) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ProviderError {
                error: code.to_string(),
                error_description: Some(description.to_string()),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for ApiErrors {
    fn into_response(self) -> Response {
        match self {
            ApiErrors::InvalidRequest(description) => {
                Self::oauth_body("invalid_request", &description)
            }
            ApiErrors::InvalidGrant(description) => Self::oauth_body("invalid_grant", &description),
            ApiErrors::InvalidClient(description) => {
                Self::oauth_body("invalid_client", &description)
            }
            ApiErrors::InternalServerError(report) => {
                let error_id = Uuid::new_v4();
                tracing::error!("internal server error (id {error_id}): {report:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ProviderError {
                        error: "server_error".to_string(),
                        error_description: Some(format!("internal error (id {error_id})")),
                    }),
                )
                    .into_response()
            }
        }
    }
}
