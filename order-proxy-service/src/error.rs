//! Error envelope returned by the order endpoints.
//!
//! Every failure of the create-order flow ends up as one of these variants and
//! is rendered as `{"error": <tag>, "detail": <payload>}` with the matching
//! HTTP status. Payloads are scrubbed of credentials before they get here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const INVALID_REQUEST_MESSAGE: &str = "amount and description required";
pub const NO_TOKEN_TAG: &str = "no_token";
pub const NO_REDIRECT_URL_TAG: &str = "no_redirect_url";
pub const UPSTREAM_ERROR_TAG: &str = "upstream_error";

#[derive(Debug, Error)]
pub enum OrderError {
    /// The caller sent no usable amount or description.
    #[error("{}", INVALID_REQUEST_MESSAGE)]
    InvalidRequest,

    /// The credential endpoint answered successfully but without a token.
    #[error("Credential endpoint returned no access token")]
    NoToken { detail: Value },

    /// The order endpoint answered without a redirect destination.
    #[error("Order endpoint returned no redirect destination")]
    NoRedirectUrl { detail: Value },

    /// Transport failure or non-success status from either provider call.
    #[error("Provider call failed (status: {status:?})")]
    Upstream { status: Option<u16>, detail: Value },
}

impl OrderError {
    /// Stable machine-readable tag placed in the `error` field.
    pub fn tag(&self) -> &'static str {
        match self {
            OrderError::InvalidRequest => INVALID_REQUEST_MESSAGE,
            OrderError::NoToken { .. } => NO_TOKEN_TAG,
            OrderError::NoRedirectUrl { .. } => NO_REDIRECT_URL_TAG,
            OrderError::Upstream { .. } => UPSTREAM_ERROR_TAG,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OrderError::InvalidRequest => StatusCode::BAD_REQUEST,
            OrderError::NoToken { .. } | OrderError::NoRedirectUrl { .. } => {
                StatusCode::BAD_GATEWAY
            }
            OrderError::Upstream { status: None, .. } => StatusCode::INTERNAL_SERVER_ERROR,
            // Only error statuses are propagated; anything else the provider
            // answered with is reported as a gateway failure.
            OrderError::Upstream {
                status: Some(code), ..
            } => StatusCode::from_u16(*code)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
        }
    }

    pub fn detail(&self) -> Option<&Value> {
        match self {
            OrderError::InvalidRequest => None,
            OrderError::NoToken { detail }
            | OrderError::NoRedirectUrl { detail }
            | OrderError::Upstream { detail, .. } => Some(detail),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a Value>,
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorEnvelope {
            error: self.tag(),
            detail: self.detail(),
        });

        (status, body).into_response()
    }
}
