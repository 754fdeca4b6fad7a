// HTTP error mapping
// Core errors become a {status_code, message} envelope in the negotiated format

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use gateway_core::codec::{self, DataFormat};
use gateway_core::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Error body returned to API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "APIResponse")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub format: DataFormat,
}

impl ApiError {
    pub fn new(format: DataFormat, err: Error) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", err);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
            format,
        }
    }

    pub fn internal(format: DataFormat, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            format,
        }
    }
}

/// HTTP status for a core error
pub fn status_for(err: &Error) -> StatusCode {
    match err.root() {
        Error::GatewayNotFound(_) => StatusCode::NOT_FOUND,
        Error::NoAvailableGateway { .. } | Error::CircuitOpen { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ if err.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            status_code: self.status.as_u16(),
            message: self.message,
        };

        match codec::encode(self.format, &envelope) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, self.format.content_type())],
                body,
            )
                .into_response(),
            Err(e) => {
                error!("Failed to encode error response: {}", e);
                (self.status, axum::Json(envelope)).into_response()
            }
        }
    }
}
