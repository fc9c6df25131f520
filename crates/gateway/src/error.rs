//! Mapping of bridge and pipeline failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use ctxbridge_core::{BridgeError, BridgePolicy, Error};

/// Failure of a single demonstration request.
#[derive(Debug)]
pub enum ApiError {
    /// The policy exists but is not enabled in configuration.
    PolicyDisabled(BridgePolicy),
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PolicyDisabled(_) => StatusCode::NOT_FOUND,
            Self::Core(Error::Bridge(bridge)) => match bridge {
                BridgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                BridgeError::BlockingForbidden => StatusCode::SERVICE_UNAVAILABLE,
                BridgeError::ContextRetrievalFailed { .. }
                | BridgeError::Cancelled { .. }
                | BridgeError::UnknownPolicy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(Error::Pipeline(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::PolicyDisabled(policy) => {
                warn!(policy = %policy, "Request for disabled bridge policy");
                format!("Bridge policy disabled: {policy}")
            }
            Self::Core(err) => {
                error!(error = %err, status = status.as_u16(), "Request failed");
                err.to_string()
            }
        };
        (status, body).into_response()
    }
}
